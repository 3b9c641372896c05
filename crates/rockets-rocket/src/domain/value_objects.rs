//! Validated value objects for the Rocket context.

use std::fmt;

use rockets_core::error::DomainError;
use uuid::Uuid;

/// Minimum number of characters in a rocket type.
pub const MIN_ROCKET_TYPE_LENGTH: usize = 5;

/// Highest launch speed accepted at launch, and the largest speed delta.
pub const MAX_LAUNCH_SPEED: i64 = 1_000_000;

/// Rocket identifier: the event channel, a UUID in text form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RocketId(String);

impl RocketId {
    /// Validates `id` as a rocket identifier.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `id` is empty or not a UUID.
    pub fn new(id: &str) -> Result<Self, DomainError> {
        if id.is_empty() {
            return Err(DomainError::Validation(
                "invalid rocket id provided: must not be empty".into(),
            ));
        }
        Uuid::parse_str(id).map_err(|e| {
            DomainError::Validation(format!("invalid rocket id provided: {id} ({e})"))
        })?;
        Ok(Self(id.to_owned()))
    }

    /// Returns the identifier as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rocket model, e.g. `Falcon-9`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RocketType(String);

impl RocketType {
    /// Validates `rocket_type`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `rocket_type` is shorter than
    /// [`MIN_ROCKET_TYPE_LENGTH`] characters.
    pub fn new(rocket_type: &str) -> Result<Self, DomainError> {
        if rocket_type.chars().count() < MIN_ROCKET_TYPE_LENGTH {
            return Err(DomainError::Validation(format!(
                "invalid rocket type provided: {rocket_type:?} is shorter than \
                 {MIN_ROCKET_TYPE_LENGTH} characters"
            )));
        }
        Ok(Self(rocket_type.to_owned()))
    }

    /// Returns the type as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Mission a rocket is flying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mission(String);

impl Mission {
    /// Validates `mission`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `mission` is empty.
    pub fn new(mission: &str) -> Result<Self, DomainError> {
        if mission.is_empty() {
            return Err(DomainError::Validation(
                "invalid rocket mission provided: must not be empty".into(),
            ));
        }
        Ok(Self(mission.to_owned()))
    }

    /// Returns the mission as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Speed reported at launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LaunchSpeed(i64);

impl LaunchSpeed {
    /// Validates `speed`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `speed` is negative or above
    /// [`MAX_LAUNCH_SPEED`].
    pub fn new(speed: i64) -> Result<Self, DomainError> {
        if !(0..=MAX_LAUNCH_SPEED).contains(&speed) {
            return Err(DomainError::Validation(format!(
                "invalid rocket launch speed provided: {speed} is outside 0..={MAX_LAUNCH_SPEED}"
            )));
        }
        Ok(Self(speed))
    }

    /// Returns the speed.
    #[must_use]
    pub fn value(self) -> i64 {
        self.0
    }
}

/// Signed change applied to a rocket's speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedDelta(i64);

impl SpeedDelta {
    /// Validates `delta`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the magnitude of `delta` is
    /// above [`MAX_LAUNCH_SPEED`].
    pub fn new(delta: i64) -> Result<Self, DomainError> {
        if delta.unsigned_abs() > MAX_LAUNCH_SPEED.unsigned_abs() {
            return Err(DomainError::Validation(format!(
                "invalid rocket speed change provided: |{delta}| exceeds {MAX_LAUNCH_SPEED}"
            )));
        }
        Ok(Self(delta))
    }

    /// Returns the signed delta.
    #[must_use]
    pub fn value(self) -> i64 {
        self.0
    }
}

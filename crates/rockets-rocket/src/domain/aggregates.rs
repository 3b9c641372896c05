//! Aggregate root for the Rocket context.
//!
//! Every mutation goes through the same state guard: it is applied only if
//! the rocket is not deleted, the event carries a timestamp, and the
//! [`GuardPolicy`] admits that timestamp relative to `updated_at`. A refused
//! mutation is a silent no-op. An applied one moves `updated_at` to the event
//! timestamp.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rockets_core::error::DomainError;

use super::value_objects::{LaunchSpeed, Mission, RocketId, RocketType, SpeedDelta};

/// Ordering predicate of the state guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuardPolicy {
    /// Admit an event whose timestamp is not after `updated_at`.
    ///
    /// This rejects every event newer than the last applied one, which is
    /// the inverse of the usual replay-safety rule. It is kept as the
    /// default for compatibility with existing producers; do not change the
    /// direction without product-owner sign-off.
    #[default]
    NotAfter,
    /// Admit an event whose timestamp is strictly after `updated_at`, so
    /// stale and replayed events are dropped.
    StrictlyAfter,
}

impl GuardPolicy {
    /// Whether an event at `at` may mutate state last updated at `updated_at`.
    #[must_use]
    pub fn admits(self, at: DateTime<Utc>, updated_at: DateTime<Utc>) -> bool {
        match self {
            Self::NotAfter => at <= updated_at,
            Self::StrictlyAfter => at > updated_at,
        }
    }
}

impl fmt::Display for GuardPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotAfter => "not-after",
            Self::StrictlyAfter => "strictly-after",
        })
    }
}

impl FromStr for GuardPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not-after" => Ok(Self::NotAfter),
            "strictly-after" => Ok(Self::StrictlyAfter),
            other => Err(DomainError::Validation(format!(
                "unknown guard policy {other:?}, expected not-after or strictly-after"
            ))),
        }
    }
}

/// Plain snapshot of a rocket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RocketPrimitives {
    /// Rocket identifier.
    pub id: String,
    /// Rocket model.
    pub rocket_type: String,
    /// Current speed, never negative.
    pub launch_speed: i64,
    /// Current mission.
    pub mission: String,
    /// Launch time.
    pub created_at: DateTime<Utc>,
    /// Time of the last applied mutation.
    pub updated_at: DateTime<Utc>,
    /// Explosion time, if the rocket is gone.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// The aggregate root for a rocket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rocket {
    id: RocketId,
    rocket_type: RocketType,
    launch_speed: i64,
    mission: Mission,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl Rocket {
    /// Creates a rocket launched at `at`.
    #[must_use]
    pub fn launch(
        id: RocketId,
        rocket_type: RocketType,
        launch_speed: LaunchSpeed,
        mission: Mission,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            rocket_type,
            launch_speed: launch_speed.value(),
            mission,
            created_at: at,
            updated_at: at,
            deleted_at: None,
        }
    }

    /// Rocket identifier.
    #[must_use]
    pub fn id(&self) -> &RocketId {
        &self.id
    }

    /// Current speed.
    #[must_use]
    pub fn launch_speed(&self) -> i64 {
        self.launch_speed
    }

    /// Launch time.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time of the last applied mutation.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Whether the rocket exploded.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns a plain snapshot of the rocket.
    #[must_use]
    pub fn primitives(&self) -> RocketPrimitives {
        RocketPrimitives {
            id: self.id.as_str().to_owned(),
            rocket_type: self.rocket_type.as_str().to_owned(),
            launch_speed: self.launch_speed,
            mission: self.mission.as_str().to_owned(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        }
    }

    /// Adds `delta` to the speed, flooring the result at zero.
    ///
    /// Returns whether the guard admitted the change.
    pub fn change_launch_speed(
        &mut self,
        delta: SpeedDelta,
        at: Option<DateTime<Utc>>,
        guard: GuardPolicy,
    ) -> bool {
        self.guarded(at, guard, |rocket| {
            rocket.launch_speed = rocket.launch_speed.saturating_add(delta.value()).max(0);
        })
    }

    /// Replaces the mission.
    ///
    /// Returns whether the guard admitted the change.
    pub fn change_mission(
        &mut self,
        mission: Mission,
        at: Option<DateTime<Utc>>,
        guard: GuardPolicy,
    ) -> bool {
        self.guarded(at, guard, |rocket| rocket.mission = mission)
    }

    /// Marks the rocket as exploded. No later mutation is accepted.
    ///
    /// Returns whether the guard admitted the change.
    pub fn delete(&mut self, at: Option<DateTime<Utc>>, guard: GuardPolicy) -> bool {
        self.guarded(at, guard, |rocket| rocket.deleted_at = at)
    }

    fn guarded(
        &mut self,
        at: Option<DateTime<Utc>>,
        guard: GuardPolicy,
        mutation: impl FnOnce(&mut Self),
    ) -> bool {
        let Some(at) = at else {
            return false;
        };
        if self.is_deleted() || !guard.admits(at, self.updated_at) {
            return false;
        }
        mutation(self);
        self.updated_at = at;
        true
    }
}

//! Domain services creating and updating rockets through the repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rockets_core::error::DomainError;
use tracing::debug;

use super::aggregates::{GuardPolicy, Rocket};
use super::repository::RocketRepository;
use super::value_objects::{LaunchSpeed, Mission, RocketId, RocketType, SpeedDelta};

/// Unvalidated input for [`RocketCreator::create`].
#[derive(Debug, Clone)]
pub struct CreateRocketParams {
    /// Rocket identifier.
    pub id: String,
    /// Rocket model.
    pub rocket_type: String,
    /// Speed at launch.
    pub launch_speed: i64,
    /// Initial mission.
    pub mission: String,
    /// Launch time.
    pub at: DateTime<Utc>,
}

/// Validates and stores newly launched rockets.
#[derive(Clone)]
pub struct RocketCreator {
    repository: Arc<dyn RocketRepository>,
}

impl RocketCreator {
    /// Creates a creator saving into `repository`.
    #[must_use]
    pub fn new(repository: Arc<dyn RocketRepository>) -> Self {
        Self { repository }
    }

    /// Validates `params` and saves a new rocket.
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation` if any field is invalid.
    /// - `DomainError::AlreadyExists` if a rocket, live or exploded, already
    ///   uses the identifier.
    /// - `DomainError::Infrastructure` if the repository fails.
    pub async fn create(&self, params: CreateRocketParams) -> Result<Rocket, DomainError> {
        let id = RocketId::new(&params.id)?;
        let rocket_type = RocketType::new(&params.rocket_type)?;
        let launch_speed = LaunchSpeed::new(params.launch_speed)?;
        let mission = Mission::new(&params.mission)?;

        if self.repository.exists(&id).await? {
            return Err(DomainError::AlreadyExists(id.to_string()));
        }

        let rocket = Rocket::launch(id, rocket_type, launch_speed, mission, params.at);
        self.repository.save(&rocket).await?;
        debug!(rocket_id = %rocket.id(), "rocket created");
        Ok(rocket)
    }
}

impl std::fmt::Debug for RocketCreator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocketCreator").finish_non_exhaustive()
    }
}

/// One guarded change applied by [`RocketUpdater::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RocketUpdate {
    /// Add a signed delta to the speed.
    LaunchSpeed {
        /// Signed change.
        delta: i64,
        /// Event time.
        at: Option<DateTime<Utc>>,
    },
    /// Replace the mission.
    Mission {
        /// New mission.
        mission: String,
        /// Event time.
        at: Option<DateTime<Utc>>,
    },
    /// Mark the rocket as exploded.
    SoftDeletion {
        /// Event time.
        at: Option<DateTime<Utc>>,
    },
}

/// Loads a live rocket, applies guarded updates and saves it.
#[derive(Clone)]
pub struct RocketUpdater {
    repository: Arc<dyn RocketRepository>,
    guard: GuardPolicy,
}

impl RocketUpdater {
    /// Creates an updater over `repository` using `guard` for every mutation.
    #[must_use]
    pub fn new(repository: Arc<dyn RocketRepository>, guard: GuardPolicy) -> Self {
        Self { repository, guard }
    }

    /// Applies `updates` in order to the rocket `rocket_id`.
    ///
    /// Updates refused by the state guard are skipped silently; the rocket
    /// is saved either way.
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation` if the id or an update value is invalid.
    ///   Nothing is applied in that case.
    /// - `DomainError::AggregateNotFound` if the rocket is absent or exploded.
    /// - `DomainError::Infrastructure` if the repository fails.
    pub async fn update(
        &self,
        rocket_id: &str,
        updates: Vec<RocketUpdate>,
    ) -> Result<Rocket, DomainError> {
        let id = RocketId::new(rocket_id)?;
        let validated = updates
            .into_iter()
            .map(Validated::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let mut rocket = self.repository.find(&id).await?;
        for update in validated {
            let applied = match update {
                Validated::LaunchSpeed(delta, at) => rocket.change_launch_speed(delta, at, self.guard),
                Validated::Mission(mission, at) => rocket.change_mission(mission, at, self.guard),
                Validated::SoftDeletion(at) => rocket.delete(at, self.guard),
            };
            if !applied {
                debug!(rocket_id = %id, guard = %self.guard, "update refused by state guard");
            }
        }

        self.repository.save(&rocket).await?;
        Ok(rocket)
    }
}

impl std::fmt::Debug for RocketUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocketUpdater")
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

enum Validated {
    LaunchSpeed(SpeedDelta, Option<DateTime<Utc>>),
    Mission(Mission, Option<DateTime<Utc>>),
    SoftDeletion(Option<DateTime<Utc>>),
}

impl TryFrom<RocketUpdate> for Validated {
    type Error = DomainError;

    fn try_from(update: RocketUpdate) -> Result<Self, Self::Error> {
        Ok(match update {
            RocketUpdate::LaunchSpeed { delta, at } => Self::LaunchSpeed(SpeedDelta::new(delta)?, at),
            RocketUpdate::Mission { mission, at } => Self::Mission(Mission::new(&mission)?, at),
            RocketUpdate::SoftDeletion { at } => Self::SoftDeletion(at),
        })
    }
}

//! Test fixtures shared by this crate's unit tests.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rockets_core::error::DomainError;

use crate::domain::aggregates::Rocket;
use crate::domain::repository::{RocketRepository, SortKey};
use crate::domain::services::CreateRocketParams;
use crate::domain::value_objects::RocketId;

pub(crate) const ROCKET_ID: &str = "0b7d2f4e-5c8a-4b31-9d1a-2f3e4c5d6e7f";

/// Launch time used across fixtures.
pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

/// A valid Falcon-9 launch on the ARTEMIS mission at `t0`.
pub(crate) fn launch_params(id: &str) -> CreateRocketParams {
    CreateRocketParams {
        id: id.to_owned(),
        rocket_type: "Falcon-9".into(),
        launch_speed: 500,
        mission: "ARTEMIS".into(),
        at: t0(),
    }
}

/// A rocket repository that always returns an infrastructure error.
#[derive(Debug)]
pub(crate) struct FailingRocketRepository;

#[async_trait]
impl RocketRepository for FailingRocketRepository {
    async fn find(&self, _id: &RocketId) -> Result<Rocket, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn exists(&self, _id: &RocketId) -> Result<bool, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn save(&self, _rocket: &Rocket) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn search(&self, _sort: SortKey) -> Result<Vec<Rocket>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

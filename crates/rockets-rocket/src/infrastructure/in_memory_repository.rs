//! Volatile rocket repository.
//!
//! All rockets live in one map behind a single reader/writer lock: readers
//! share it, a writer excludes everyone. Contents are lost on restart.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use rockets_core::error::DomainError;
use tokio::sync::RwLock;

use crate::domain::aggregates::Rocket;
use crate::domain::repository::{RocketRepository, SortField, SortKey};
use crate::domain::value_objects::RocketId;

/// In-memory `RocketRepository`, keyed and iterated by rocket id.
#[derive(Debug, Default)]
pub struct InMemoryRocketRepository {
    rockets: RwLock<BTreeMap<RocketId, Rocket>>,
}

impl InMemoryRocketRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn compare(sort: SortKey, left: &Rocket, right: &Rocket) -> Ordering {
    let ordering = match sort.field {
        SortField::CreatedAt => left.created_at().cmp(&right.created_at()),
        SortField::UpdatedAt => left.updated_at().cmp(&right.updated_at()),
        SortField::LaunchSpeed => left.launch_speed().cmp(&right.launch_speed()),
        SortField::Unrecognized => return Ordering::Equal,
    };
    if sort.ascending { ordering } else { ordering.reverse() }
}

#[async_trait]
impl RocketRepository for InMemoryRocketRepository {
    async fn find(&self, id: &RocketId) -> Result<Rocket, DomainError> {
        let rockets = self.rockets.read().await;
        match rockets.get(id) {
            Some(rocket) if !rocket.is_deleted() => Ok(rocket.clone()),
            _ => Err(DomainError::AggregateNotFound(id.to_string())),
        }
    }

    async fn exists(&self, id: &RocketId) -> Result<bool, DomainError> {
        Ok(self.rockets.read().await.contains_key(id))
    }

    async fn save(&self, rocket: &Rocket) -> Result<(), DomainError> {
        self.rockets
            .write()
            .await
            .insert(rocket.id().clone(), rocket.clone());
        Ok(())
    }

    async fn search(&self, sort: SortKey) -> Result<Vec<Rocket>, DomainError> {
        let mut live: Vec<Rocket> = self
            .rockets
            .read()
            .await
            .values()
            .filter(|rocket| !rocket.is_deleted())
            .cloned()
            .collect();
        // Stable: ties and unrecognized fields keep id order.
        live.sort_by(|left, right| compare(sort, left, right));
        Ok(live)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::aggregates::GuardPolicy;
    use crate::domain::value_objects::{LaunchSpeed, Mission, RocketType, SpeedDelta};
    use crate::testing::t0;

    const IDS: [&str; 3] = [
        "00000000-0000-4000-8000-000000000001",
        "00000000-0000-4000-8000-000000000002",
        "00000000-0000-4000-8000-000000000003",
    ];

    fn rocket(id: &str, speed: i64, created_offset_secs: i64) -> Rocket {
        Rocket::launch(
            RocketId::new(id).unwrap(),
            RocketType::new("Falcon-9").unwrap(),
            LaunchSpeed::new(speed).unwrap(),
            Mission::new("ARTEMIS").unwrap(),
            t0() + Duration::seconds(created_offset_secs),
        )
    }

    async fn seeded() -> InMemoryRocketRepository {
        let repo = InMemoryRocketRepository::new();
        repo.save(&rocket(IDS[0], 300, 20)).await.unwrap();
        repo.save(&rocket(IDS[1], 100, 0)).await.unwrap();
        repo.save(&rocket(IDS[2], 200, 10)).await.unwrap();
        repo
    }

    fn ids(rockets: &[Rocket]) -> Vec<&str> {
        rockets.iter().map(|r| r.id().as_str()).collect()
    }

    #[tokio::test]
    async fn test_find_returns_saved_rocket() {
        let repo = seeded().await;
        let id = RocketId::new(IDS[1]).unwrap();

        let found = repo.find(&id).await.unwrap();

        assert_eq!(found.primitives().launch_speed, 100);
    }

    #[tokio::test]
    async fn test_soft_deleted_rocket_is_not_found_but_exists() {
        // Arrange
        let repo = seeded().await;
        let id = RocketId::new(IDS[0]).unwrap();
        let mut exploded = repo.find(&id).await.unwrap();
        exploded.delete(Some(t0()), GuardPolicy::NotAfter);
        repo.save(&exploded).await.unwrap();

        // Act
        let found = repo.find(&id).await;
        let listed = repo.search(SortKey::parse("launch_speed")).await.unwrap();

        // Assert
        assert!(matches!(found, Err(DomainError::AggregateNotFound(_))));
        assert!(repo.exists(&id).await.unwrap());
        assert_eq!(ids(&listed), vec![IDS[1], IDS[2]]);
    }

    #[tokio::test]
    async fn test_search_orders_by_requested_field() {
        let repo = seeded().await;

        let by_speed = repo.search(SortKey::parse("launch_speed")).await.unwrap();
        let by_created_desc = repo.search(SortKey::parse("-created_at")).await.unwrap();

        assert_eq!(ids(&by_speed), vec![IDS[1], IDS[2], IDS[0]]);
        assert_eq!(ids(&by_created_desc), vec![IDS[0], IDS[2], IDS[1]]);
    }

    #[tokio::test]
    async fn test_search_by_updated_at_follows_mutations() {
        // Arrange
        let repo = seeded().await;
        let id = RocketId::new(IDS[2]).unwrap();
        let mut rocket = repo.find(&id).await.unwrap();
        rocket.change_launch_speed(
            SpeedDelta::new(1).unwrap(),
            Some(t0() + Duration::seconds(60)),
            GuardPolicy::StrictlyAfter,
        );
        repo.save(&rocket).await.unwrap();

        // Act
        let listed = repo.search(SortKey::parse("-updated_at")).await.unwrap();

        // Assert
        assert_eq!(ids(&listed)[0], IDS[2]);
    }

    #[tokio::test]
    async fn test_unknown_sort_key_keeps_stable_id_order() {
        let repo = seeded().await;

        let first = repo.search(SortKey::parse("altitude")).await.unwrap();
        let second = repo.search(SortKey::parse("-altitude")).await.unwrap();

        assert_eq!(ids(&first), IDS.to_vec());
        assert_eq!(ids(&second), IDS.to_vec());
    }

    #[tokio::test]
    async fn test_search_on_empty_repository_is_empty() {
        let repo = InMemoryRocketRepository::new();

        assert!(repo.search(SortKey::default()).await.unwrap().is_empty());
    }
}

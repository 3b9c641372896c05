//! Rocket repository contract and search ordering.

use async_trait::async_trait;
use rockets_core::error::DomainError;

use super::aggregates::Rocket;
use super::value_objects::RocketId;

/// Sort token used when a search names none.
pub const DEFAULT_SORT: &str = "-created_at";

/// Field a search is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    /// Launch time.
    CreatedAt,
    /// Time of the last applied mutation.
    UpdatedAt,
    /// Current speed.
    LaunchSpeed,
    /// Any other token. Results come back in a stable, unspecified order.
    Unrecognized,
}

/// Ordering of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    /// Field to order by.
    pub field: SortField,
    /// Ascending unless the token had a leading `-`.
    pub ascending: bool,
}

impl SortKey {
    /// Parses a sort token such as `launch_speed` or `-created_at`.
    ///
    /// Unknown fields never fail; they parse to [`SortField::Unrecognized`].
    #[must_use]
    pub fn parse(token: &str) -> Self {
        let (name, ascending) = match token.strip_prefix('-') {
            Some(name) => (name, false),
            None => (token, true),
        };
        let field = match name {
            "created_at" => SortField::CreatedAt,
            "updated_at" => SortField::UpdatedAt,
            "launch_speed" => SortField::LaunchSpeed,
            _ => SortField::Unrecognized,
        };
        Self { field, ascending }
    }
}

impl Default for SortKey {
    fn default() -> Self {
        Self::parse(DEFAULT_SORT)
    }
}

/// Storage of rocket aggregates.
#[async_trait]
pub trait RocketRepository: Send + Sync {
    /// Loads a live rocket.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the rocket is absent or
    /// soft-deleted, `DomainError::Infrastructure` on store failure.
    async fn find(&self, id: &RocketId) -> Result<Rocket, DomainError>;

    /// Whether any rocket, live or soft-deleted, is stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on store failure.
    async fn exists(&self, id: &RocketId) -> Result<bool, DomainError>;

    /// Inserts or replaces `rocket`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on store failure.
    async fn save(&self, rocket: &Rocket) -> Result<(), DomainError>;

    /// Lists live rockets in the requested order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on store failure.
    async fn search(&self, sort: SortKey) -> Result<Vec<Rocket>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reads_direction_from_leading_dash() {
        assert_eq!(
            SortKey::parse("-launch_speed"),
            SortKey {
                field: SortField::LaunchSpeed,
                ascending: false
            }
        );
        assert_eq!(
            SortKey::parse("updated_at"),
            SortKey {
                field: SortField::UpdatedAt,
                ascending: true
            }
        );
    }

    #[test]
    fn test_parse_accepts_unknown_fields() {
        assert_eq!(SortKey::parse("-altitude").field, SortField::Unrecognized);
        assert_eq!(SortKey::parse("").field, SortField::Unrecognized);
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        assert_eq!(
            SortKey::default(),
            SortKey {
                field: SortField::CreatedAt,
                ascending: false
            }
        );
    }
}

//! Deduplicator trait.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::DeduplicationError;

/// Retention window used when none is configured.
pub const DEFAULT_DEDUPLICATION_TTL: Duration = Duration::from_secs(29);

/// Tracks event identities that were already processed.
///
/// Presence of an unexpired record means "duplicate". Records are ephemeral:
/// absence means the identity was never seen or its window expired.
#[async_trait]
pub trait Deduplicator: Send + Sync {
    /// Whether `event_id` has an unexpired record.
    ///
    /// A check followed by [`mark_processed`](Self::mark_processed) is not
    /// atomic: two racing callers can both observe `false`. Use
    /// [`try_claim`](Self::try_claim) when the answer gates processing.
    async fn is_duplicate(&self, event_id: &str) -> Result<bool, DeduplicationError>;

    /// Records `event_id` as processed for `ttl`, overwriting any record.
    async fn mark_processed(&self, event_id: &str, ttl: Duration)
    -> Result<(), DeduplicationError>;

    /// Atomically records `event_id` for `ttl` if no unexpired record exists.
    ///
    /// Returns `true` for the single caller that created the record and
    /// `false` for every duplicate.
    async fn try_claim(&self, event_id: &str, ttl: Duration) -> Result<bool, DeduplicationError>;

    /// Drops the record for `event_id` so a redelivery is processed again.
    async fn forget(&self, event_id: &str) -> Result<(), DeduplicationError>;
}

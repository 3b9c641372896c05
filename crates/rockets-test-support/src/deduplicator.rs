//! Test deduplicators.

use std::time::Duration;

use async_trait::async_trait;
use rockets_messaging::{DeduplicationError, Deduplicator};

/// A deduplicator whose store is always unreachable.
#[derive(Debug)]
pub struct FailingDeduplicator;

#[async_trait]
impl Deduplicator for FailingDeduplicator {
    async fn is_duplicate(&self, _event_id: &str) -> Result<bool, DeduplicationError> {
        Err(DeduplicationError::Backend("connection refused".into()))
    }

    async fn mark_processed(
        &self,
        _event_id: &str,
        _ttl: Duration,
    ) -> Result<(), DeduplicationError> {
        Err(DeduplicationError::Backend("connection refused".into()))
    }

    async fn try_claim(&self, _event_id: &str, _ttl: Duration) -> Result<bool, DeduplicationError> {
        Err(DeduplicationError::Backend("connection refused".into()))
    }

    async fn forget(&self, _event_id: &str) -> Result<(), DeduplicationError> {
        Err(DeduplicationError::Backend("connection refused".into()))
    }
}

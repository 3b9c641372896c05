//! Redis implementation of the `Deduplicator` trait.
//!
//! Records are keys named after the event identity holding `"1"`:
//! - claim / mark: `SET id 1 [NX] PX ttl`
//! - check: `EXISTS id`
//! - forget: `DEL id`

use std::time::Duration;

use async_trait::async_trait;
use redis::Client;
use redis::aio::ConnectionManager;

use crate::deduplicator::Deduplicator;
use crate::error::DeduplicationError;

/// Redis-backed deduplicator shared by every service instance.
#[derive(Clone)]
pub struct RedisDeduplicator {
    conn_manager: ConnectionManager,
}

impl RedisDeduplicator {
    /// Wraps an existing connection manager.
    #[must_use]
    pub fn new(conn_manager: ConnectionManager) -> Self {
        Self { conn_manager }
    }

    /// Connects to Redis at `redis_url`.
    ///
    /// # Errors
    ///
    /// Returns `DeduplicationError::Backend` if the URL is malformed or the
    /// connection cannot be established.
    pub async fn connect(redis_url: &str) -> Result<Self, DeduplicationError> {
        let client = Client::open(redis_url).map_err(|e| {
            DeduplicationError::Backend(format!("failed to create Redis client: {e}"))
        })?;
        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            DeduplicationError::Backend(format!("failed to create Redis connection manager: {e}"))
        })?;
        Ok(Self::new(conn_manager))
    }
}

fn ttl_millis(ttl: Duration) -> Result<u64, DeduplicationError> {
    match u64::try_from(ttl.as_millis()) {
        Ok(0) | Err(_) => Err(DeduplicationError::InvalidTtl(ttl)),
        Ok(ms) => Ok(ms),
    }
}

/// `SET ... NX` answers `OK` when it wrote the key and nil otherwise.
fn claimed(reply: Option<&str>) -> bool {
    reply.is_some()
}

impl std::fmt::Debug for RedisDeduplicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisDeduplicator").finish_non_exhaustive()
    }
}

#[async_trait]
impl Deduplicator for RedisDeduplicator {
    async fn is_duplicate(&self, event_id: &str) -> Result<bool, DeduplicationError> {
        let mut conn = self.conn_manager.clone();

        let exists: i64 = redis::cmd("EXISTS")
            .arg(event_id)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                DeduplicationError::Backend(format!("failed to check message duplicity: {e}"))
            })?;

        Ok(exists == 1)
    }

    async fn mark_processed(
        &self,
        event_id: &str,
        ttl: Duration,
    ) -> Result<(), DeduplicationError> {
        let ttl_ms = ttl_millis(ttl)?;
        let mut conn = self.conn_manager.clone();

        let _: () = redis::cmd("SET")
            .arg(event_id)
            .arg("1")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                DeduplicationError::Backend(format!("failed to mark message as processed: {e}"))
            })?;

        Ok(())
    }

    async fn try_claim(&self, event_id: &str, ttl: Duration) -> Result<bool, DeduplicationError> {
        let ttl_ms = ttl_millis(ttl)?;
        let mut conn = self.conn_manager.clone();

        let reply: Option<String> = redis::cmd("SET")
            .arg(event_id)
            .arg("1")
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| DeduplicationError::Backend(format!("failed to claim message: {e}")))?;

        Ok(claimed(reply.as_deref()))
    }

    async fn forget(&self, event_id: &str) -> Result<(), DeduplicationError> {
        let mut conn = self.conn_manager.clone();

        let _deleted: i64 = redis::cmd("DEL")
            .arg(event_id)
            .query_async(&mut conn)
            .await
            .map_err(|e| DeduplicationError::Backend(format!("failed to forget message: {e}")))?;

        Ok(())
    }
}

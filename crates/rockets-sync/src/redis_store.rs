//! Redis implementation of the `LockStore` trait.
//!
//! Locks are plain keys holding the owner's random token:
//! - acquire: Lua script granting an absent key (`SET PX`) or refreshing
//!   the expiry of a key already holding the caller's token, so an attempt
//!   retried after a lost reply still succeeds
//! - release: compare-and-delete in a Lua script, so a lock that expired
//!   and was taken over by another owner is never deleted by the old one

use std::time::Duration;

use async_trait::async_trait;
use redis::Client;
use redis::aio::ConnectionManager;

use crate::error::LockStoreError;
use crate::store::LockStore;

const ACQUIRE_SCRIPT: &str = r"
    local current = redis.call('GET', KEYS[1])
    if not current then
        redis.call('SET', KEYS[1], ARGV[1], 'PX', ARGV[2])
        return 1
    end
    if current == ARGV[1] then
        redis.call('PEXPIRE', KEYS[1], ARGV[2])
        return 1
    end
    return 0
";

const RELEASE_SCRIPT: &str = r"
    if redis.call('GET', KEYS[1]) == ARGV[1] then
        return redis.call('DEL', KEYS[1])
    end
    return 0
";

/// Redis-backed lock store shared by every service instance.
///
/// Cloning is cheap; clones share the same `ConnectionManager`.
#[derive(Clone)]
pub struct RedisLockStore {
    conn_manager: ConnectionManager,
}

impl RedisLockStore {
    /// Wraps an existing connection manager.
    #[must_use]
    pub fn new(conn_manager: ConnectionManager) -> Self {
        Self { conn_manager }
    }

    /// Connects to Redis at `redis_url`.
    ///
    /// # Errors
    ///
    /// Returns `LockStoreError::Backend` if the URL is malformed or the
    /// connection cannot be established.
    pub async fn connect(redis_url: &str) -> Result<Self, LockStoreError> {
        let client = Client::open(redis_url)
            .map_err(|e| LockStoreError::Backend(format!("failed to create Redis client: {e}")))?;
        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            LockStoreError::Backend(format!("failed to create Redis connection manager: {e}"))
        })?;
        Ok(Self::new(conn_manager))
    }
}

fn expiry_millis(expiry: Duration) -> Result<u64, LockStoreError> {
    match u64::try_from(expiry.as_millis()) {
        Ok(0) | Err(_) => Err(LockStoreError::Backend(format!("invalid expiry: {expiry:?}"))),
        Ok(ms) => Ok(ms),
    }
}

/// Maps an acquire or release script reply to granted / released.
fn script_succeeded(reply: i64) -> bool {
    reply == 1
}

impl std::fmt::Debug for RedisLockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisLockStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl LockStore for RedisLockStore {
    async fn try_acquire(
        &self,
        name: &str,
        token: &str,
        expiry: Duration,
    ) -> Result<bool, LockStoreError> {
        let expiry_ms = expiry_millis(expiry)?;
        let mut conn = self.conn_manager.clone();

        let granted: i64 = redis::Script::new(ACQUIRE_SCRIPT)
            .key(name)
            .arg(token)
            .arg(expiry_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| LockStoreError::Backend(format!("acquire script failed: {e}")))?;

        Ok(script_succeeded(granted))
    }

    async fn release(&self, name: &str, token: &str) -> Result<bool, LockStoreError> {
        let mut conn = self.conn_manager.clone();

        let deleted: i64 = redis::Script::new(RELEASE_SCRIPT)
            .key(name)
            .arg(token)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| LockStoreError::Backend(format!("release script failed: {e}")))?;

        Ok(script_succeeded(deleted))
    }
}

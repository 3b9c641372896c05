//! Lock store abstraction.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::LockStoreError;

/// Shared store holding expiring, token-owned locks.
///
/// Implementations must make both operations atomic on the store side: a
/// lock is either granted to exactly one token or not at all, and only the
/// owning token may release it.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Tries once to take `name` for `token` with the given expiry.
    ///
    /// Returns `Ok(false)` when another owner holds an unexpired lock.
    async fn try_acquire(
        &self,
        name: &str,
        token: &str,
        expiry: Duration,
    ) -> Result<bool, LockStoreError>;

    /// Releases `name` if it is still held by `token`.
    ///
    /// Returns `Ok(false)` when the lock expired or belongs to someone else.
    async fn release(&self, name: &str, token: &str) -> Result<bool, LockStoreError>;
}

//! Test lock stores — `LockStore` doubles for coordination failures.

use std::time::Duration;

use async_trait::async_trait;
use rockets_sync::{LockStore, LockStoreError};

/// A lock store whose backend is always unreachable. Every acquisition
/// fails, so a mutex over it never runs its callback.
#[derive(Debug)]
pub struct FailingLockStore;

#[async_trait]
impl LockStore for FailingLockStore {
    async fn try_acquire(
        &self,
        _name: &str,
        _token: &str,
        _expiry: Duration,
    ) -> Result<bool, LockStoreError> {
        Err(LockStoreError::Backend("connection refused".into()))
    }

    async fn release(&self, _name: &str, _token: &str) -> Result<bool, LockStoreError> {
        Err(LockStoreError::Backend("connection refused".into()))
    }
}

/// A lock store that grants every lock but fails every release. Useful for
/// testing the release-failure path after a callback has run.
#[derive(Debug)]
pub struct UnreleasableLockStore;

#[async_trait]
impl LockStore for UnreleasableLockStore {
    async fn try_acquire(
        &self,
        _name: &str,
        _token: &str,
        _expiry: Duration,
    ) -> Result<bool, LockStoreError> {
        Ok(true)
    }

    async fn release(&self, _name: &str, _token: &str) -> Result<bool, LockStoreError> {
        Err(LockStoreError::Backend("connection reset".into()))
    }
}

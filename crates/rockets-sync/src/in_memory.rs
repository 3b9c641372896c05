//! In-process lock store.
//!
//! Coordinates tasks inside a single process only. Used when no shared
//! coordination store is configured, and in tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rockets_core::clock::{Clock, SystemClock};

use crate::error::LockStoreError;
use crate::store::LockStore;

#[derive(Debug, Clone)]
struct Lease {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Lock store backed by a process-local map with clock-driven expiry.
pub struct InMemoryLockStore {
    leases: Mutex<HashMap<String, Lease>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryLockStore {
    /// Creates an empty store reading time from the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store reading time from `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            leases: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Whether `name` is currently held by anyone.
    ///
    /// # Errors
    ///
    /// Returns `LockStoreError::Backend` if the internal map is poisoned.
    pub fn is_locked(&self, name: &str) -> Result<bool, LockStoreError> {
        let now = self.clock.now();
        let leases = self.lock_leases()?;
        Ok(leases.get(name).is_some_and(|lease| lease.expires_at > now))
    }

    fn lock_leases(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, Lease>>, LockStoreError> {
        self.leases
            .lock()
            .map_err(|_| LockStoreError::Backend("lease map poisoned".into()))
    }
}

impl Default for InMemoryLockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryLockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLockStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl LockStore for InMemoryLockStore {
    async fn try_acquire(
        &self,
        name: &str,
        token: &str,
        expiry: Duration,
    ) -> Result<bool, LockStoreError> {
        let now = self.clock.now();
        let ttl = chrono::Duration::from_std(expiry)
            .map_err(|e| LockStoreError::Backend(format!("invalid expiry: {e}")))?;
        let mut leases = self.lock_leases()?;

        if leases
            .get(name)
            .is_some_and(|lease| lease.expires_at > now && lease.token != token)
        {
            return Ok(false);
        }

        leases.insert(
            name.to_owned(),
            Lease {
                token: token.to_owned(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn release(&self, name: &str, token: &str) -> Result<bool, LockStoreError> {
        let now = self.clock.now();
        let mut leases = self.lock_leases()?;

        match leases.get(name) {
            Some(lease) if lease.token == token && lease.expires_at > now => {
                leases.remove(name);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

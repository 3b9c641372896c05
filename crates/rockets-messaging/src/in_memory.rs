//! In-process deduplicator.
//!
//! Only suppresses duplicates delivered to the same process. Used when no
//! shared coordination store is configured, and in tests. Expired records
//! are swept on writes, at most once per second.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rockets_core::clock::{Clock, SystemClock};

use crate::deduplicator::Deduplicator;
use crate::error::DeduplicationError;

const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct Records {
    expiries: HashMap<String, DateTime<Utc>>,
    swept_at: DateTime<Utc>,
}

impl Records {
    fn sweep(&mut self, now: DateTime<Utc>) {
        let due = (now - self.swept_at)
            .to_std()
            .is_ok_and(|elapsed| elapsed >= SWEEP_INTERVAL);
        if due {
            self.expiries.retain(|_, expires_at| *expires_at > now);
            self.swept_at = now;
        }
    }
}

/// Deduplicator backed by a process-local map with clock-driven expiry.
pub struct InMemoryDeduplicator {
    records: Mutex<Records>,
    clock: Arc<dyn Clock>,
}

impl InMemoryDeduplicator {
    /// Creates an empty deduplicator reading time from the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty deduplicator reading time from `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let swept_at = clock.now();
        Self {
            records: Mutex::new(Records {
                expiries: HashMap::new(),
                swept_at,
            }),
            clock,
        }
    }

    fn records(&self) -> Result<MutexGuard<'_, Records>, DeduplicationError> {
        self.records
            .lock()
            .map_err(|_| DeduplicationError::Backend("record map poisoned".into()))
    }

    fn expiry_after(
        &self,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<DateTime<Utc>, DeduplicationError> {
        let ttl = chrono::Duration::from_std(ttl).map_err(|_| DeduplicationError::InvalidTtl(ttl))?;
        Ok(now + ttl)
    }
}

impl Default for InMemoryDeduplicator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryDeduplicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDeduplicator").finish_non_exhaustive()
    }
}

#[async_trait]
impl Deduplicator for InMemoryDeduplicator {
    async fn is_duplicate(&self, event_id: &str) -> Result<bool, DeduplicationError> {
        let now = self.clock.now();
        let mut records = self.records()?;

        match records.expiries.get(event_id) {
            Some(expires_at) if *expires_at > now => Ok(true),
            Some(_) => {
                records.expiries.remove(event_id);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn mark_processed(
        &self,
        event_id: &str,
        ttl: Duration,
    ) -> Result<(), DeduplicationError> {
        let now = self.clock.now();
        let expires_at = self.expiry_after(now, ttl)?;
        let mut records = self.records()?;
        records.sweep(now);
        records.expiries.insert(event_id.to_owned(), expires_at);
        Ok(())
    }

    async fn try_claim(&self, event_id: &str, ttl: Duration) -> Result<bool, DeduplicationError> {
        let now = self.clock.now();
        let expires_at = self.expiry_after(now, ttl)?;
        let mut records = self.records()?;
        records.sweep(now);

        if records
            .expiries
            .get(event_id)
            .is_some_and(|existing| *existing > now)
        {
            return Ok(false);
        }
        records.expiries.insert(event_id.to_owned(), expires_at);
        Ok(true)
    }

    async fn forget(&self, event_id: &str) -> Result<(), DeduplicationError> {
        self.records()?.expiries.remove(event_id);
        Ok(())
    }
}

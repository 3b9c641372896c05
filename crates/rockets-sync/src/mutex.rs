//! Mutex service.
//!
//! `with_lock` acquires `distributed-sync-mutex[:prefix]:key` in the shared
//! lock store, runs the callback exactly once while the lock is held and then
//! releases it. The locked section (callback plus release) runs on its own
//! task: dropping the caller's future while waiting for the lock abandons the
//! acquisition, but once the callback has started it runs to completion and
//! the lock is released.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::{LockStoreError, MutexError};
use crate::retry::{RetryPolicy, retry};
use crate::store::LockStore;

const LOCK_NAME_PREFIX: &str = "distributed-sync-mutex";

/// Tuning for lock acquisition and release.
#[derive(Debug, Clone, PartialEq)]
pub struct MutexOptions {
    /// How long a granted lock lives before the store drops it.
    pub expiry: Duration,
    /// Attempts for acquisition and, independently, for release.
    pub retries: u32,
    /// Base delay between two attempts.
    pub retry_delay: Duration,
    /// Per-attempt timeout as a fraction of `expiry`; also the jitter
    /// fraction applied to `retry_delay`.
    pub timeout_factor: f64,
    /// Optional namespace inserted between the fixed prefix and the key.
    pub service_prefix: Option<String>,
}

impl Default for MutexOptions {
    fn default() -> Self {
        Self {
            expiry: Duration::from_secs(30),
            retries: 5,
            retry_delay: Duration::from_millis(250),
            timeout_factor: 0.05,
            service_prefix: None,
        }
    }
}

impl MutexOptions {
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retries,
            delay: self.retry_delay,
            jitter: self.timeout_factor,
        }
    }

    fn attempt_timeout(&self) -> Duration {
        let timeout = self.expiry.mul_f64(self.timeout_factor.clamp(0.0, 1.0));
        if timeout.is_zero() { self.expiry } else { timeout }
    }
}

/// Runs callbacks under a named lock shared by every service instance.
#[derive(Clone)]
pub struct MutexService {
    store: Arc<dyn LockStore>,
    options: MutexOptions,
}

impl MutexService {
    /// Creates a mutex service over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn LockStore>, options: MutexOptions) -> Self {
        Self { store, options }
    }

    /// Fully qualified lock name for `key`.
    #[must_use]
    pub fn lock_name(&self, key: &str) -> String {
        match self.options.service_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => format!("{LOCK_NAME_PREFIX}:{prefix}:{key}"),
            _ => format!("{LOCK_NAME_PREFIX}:{key}"),
        }
    }

    /// Runs `operation` while holding the lock for `key`.
    ///
    /// The outer `Result` reports coordination failures; the inner one is
    /// the callback's own result, returned untouched.
    ///
    /// # Errors
    ///
    /// - `MutexError::LockAcquisitionFailed` if the lock could not be taken
    ///   within the retry budget. `operation` is not invoked, and a lock an
    ///   unanswered attempt may have taken under this call's token is
    ///   released.
    /// - `MutexError::LockReleaseFailed` if `operation` ran but the lock could
    ///   not be released. The callback's result is logged and dropped.
    /// - `MutexError::OperationAborted` if `operation` panicked or the locked
    ///   section's task was cancelled by the runtime.
    pub async fn with_lock<F, Fut, T, E>(
        &self,
        key: &str,
        operation: F,
    ) -> Result<Result<T, E>, MutexError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let name = self.lock_name(key);
        let token = Uuid::new_v4().to_string();

        if let Err(source) = self.acquire(&name, &token).await {
            self.abandon(&name, &token).await;
            return Err(MutexError::LockAcquisitionFailed { key: name, source });
        }
        debug!(mutex_key = %name, "lock acquired");

        let this = self.clone();
        let section_name = name.clone();
        let section = tokio::spawn(async move {
            let outcome = tokio::spawn(operation()).await;
            let released = this.release(&section_name, &token).await;
            (outcome, released)
        });

        let (outcome, released) = section.await.map_err(|e| MutexError::OperationAborted {
            key: name.clone(),
            reason: e.to_string(),
        })?;

        match (outcome, released) {
            (outcome, Err(source)) => {
                let operation_succeeded = matches!(outcome, Ok(Ok(_)));
                error!(
                    mutex_key = %name,
                    operation_succeeded,
                    error = %source,
                    "failed to release lock, it stays held until expiry"
                );
                Err(MutexError::LockReleaseFailed {
                    key: name,
                    operation_succeeded,
                    source,
                })
            }
            (Ok(result), Ok(())) => {
                debug!(mutex_key = %name, "lock released");
                Ok(result)
            }
            (Err(join_error), Ok(())) => {
                error!(mutex_key = %name, error = %join_error, "locked operation aborted");
                Err(MutexError::OperationAborted {
                    key: name,
                    reason: join_error.to_string(),
                })
            }
        }
    }

    async fn acquire(&self, name: &str, token: &str) -> Result<(), LockStoreError> {
        let timeout = self.options.attempt_timeout();
        let expiry = self.options.expiry;

        retry(&self.options.retry_policy(), "lock.acquire", || async move {
            match tokio::time::timeout(timeout, self.store.try_acquire(name, token, expiry)).await
            {
                Ok(Ok(true)) => Ok(()),
                Ok(Ok(false)) => Err(LockStoreError::Contended),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(LockStoreError::Timeout(timeout)),
            }
        })
        .await
    }

    // An attempt that timed out may still have been granted by the store.
    async fn abandon(&self, name: &str, token: &str) {
        let timeout = self.options.attempt_timeout();
        match tokio::time::timeout(timeout, self.store.release(name, token)).await {
            Ok(Ok(true)) => warn!(mutex_key = %name, "released lock granted to a timed-out attempt"),
            Ok(Ok(false)) => {}
            Ok(Err(e)) => warn!(
                mutex_key = %name,
                error = %e,
                "could not clear abandoned acquisition, lock may stay held until expiry"
            ),
            Err(_) => warn!(
                mutex_key = %name,
                "lock store did not answer while clearing abandoned acquisition"
            ),
        }
    }

    async fn release(&self, name: &str, token: &str) -> Result<(), LockStoreError> {
        let timeout = self.options.attempt_timeout();

        retry(&self.options.retry_policy(), "lock.release", || async move {
            match tokio::time::timeout(timeout, self.store.release(name, token)).await {
                Ok(Ok(true)) => Ok(()),
                Ok(Ok(false)) => Err(LockStoreError::NotHeld),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(LockStoreError::Timeout(timeout)),
            }
        })
        .await
    }
}

impl std::fmt::Debug for MutexService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutexService")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::in_memory::InMemoryLockStore;

    fn fast_options() -> MutexOptions {
        MutexOptions {
            expiry: Duration::from_secs(5),
            retries: 3,
            retry_delay: Duration::from_millis(1),
            timeout_factor: 0.2,
            service_prefix: None,
        }
    }

    fn service_over(store: Arc<InMemoryLockStore>, options: MutexOptions) -> MutexService {
        MutexService::new(store, options)
    }

    #[tokio::test]
    async fn test_with_lock_runs_operation_once_and_releases() {
        // Arrange
        let store = Arc::new(InMemoryLockStore::new());
        let service = service_over(Arc::clone(&store), fast_options());
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        // Act
        let result = service
            .with_lock("rocket:1", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(42)
            })
            .await;

        // Assert
        assert!(matches!(result, Ok(Ok(42))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!store.is_locked("distributed-sync-mutex:rocket:1").unwrap());
    }

    #[tokio::test]
    async fn test_operation_error_is_returned_as_inner_result() {
        // Arrange
        let store = Arc::new(InMemoryLockStore::new());
        let service = service_over(Arc::clone(&store), fast_options());

        // Act
        let result = service
            .with_lock("rocket:1", || async { Err::<(), _>("boom".to_owned()) })
            .await;

        // Assert
        match result {
            Ok(Err(message)) => assert_eq!(message, "boom"),
            other => panic!("expected inner error, got {other:?}"),
        }
        assert!(!store.is_locked("distributed-sync-mutex:rocket:1").unwrap());
    }

    #[tokio::test]
    async fn test_acquisition_failure_never_invokes_operation() {
        // Arrange
        let store = Arc::new(InMemoryLockStore::new());
        store
            .try_acquire(
                "distributed-sync-mutex:rocket:1",
                "someone-else",
                Duration::from_secs(60),
            )
            .await
            .unwrap();
        let service = service_over(Arc::clone(&store), fast_options());
        let invoked = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&invoked);

        // Act
        let result = service
            .with_lock("rocket:1", move || async move {
                flag.store(true, Ordering::SeqCst);
                Ok::<_, String>(())
            })
            .await;

        // Assert
        match result {
            Err(MutexError::LockAcquisitionFailed { key, source }) => {
                assert_eq!(key, "distributed-sync-mutex:rocket:1");
                assert_eq!(source, LockStoreError::Contended);
            }
            other => panic!("expected LockAcquisitionFailed, got {other:?}"),
        }
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_key_never_interleaves() {
        // Arrange
        let store = Arc::new(InMemoryLockStore::new());
        let options = MutexOptions {
            retries: 200,
            retry_delay: Duration::from_millis(2),
            ..fast_options()
        };
        let service = service_over(store, options);
        let active = Arc::new(AtomicU32::new(0));
        let max_active = Arc::new(AtomicU32::new(0));
        let completed = Arc::new(AtomicU32::new(0));

        // Act
        let mut tasks = Vec::new();
        for _ in 0..6 {
            let service = service.clone();
            let active = Arc::clone(&active);
            let max_active = Arc::clone(&max_active);
            let completed = Arc::clone(&completed);
            tasks.push(tokio::spawn(async move {
                service
                    .with_lock("rocket:shared", move || async move {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        max_active.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(15)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                        completed.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, String>(())
                    })
                    .await
            }));
        }
        for task in tasks {
            assert!(matches!(task.await.unwrap(), Ok(Ok(()))));
        }

        // Assert
        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        assert_eq!(completed.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_dropping_caller_does_not_preempt_locked_operation() {
        // Arrange
        let store = Arc::new(InMemoryLockStore::new());
        let service = service_over(Arc::clone(&store), fast_options());
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let caller = tokio::spawn(async move {
            service
                .with_lock("rocket:1", move || async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    flag.store(true, Ordering::SeqCst);
                    Ok::<_, String>(())
                })
                .await
        });

        // Act
        tokio::time::sleep(Duration::from_millis(10)).await;
        caller.abort();
        tokio::time::sleep(Duration::from_millis(150)).await;

        // Assert
        assert!(finished.load(Ordering::SeqCst));
        assert!(!store.is_locked("distributed-sync-mutex:rocket:1").unwrap());
    }

    #[tokio::test]
    async fn test_panicking_operation_is_aborted_and_lock_released() {
        // Arrange
        let store = Arc::new(InMemoryLockStore::new());
        let service = service_over(Arc::clone(&store), fast_options());

        // Act
        let result = service
            .with_lock("rocket:1", || async {
                if true {
                    panic!("handler blew up");
                }
                Ok::<(), String>(())
            })
            .await;

        // Assert
        assert!(matches!(result, Err(MutexError::OperationAborted { .. })));
        assert!(!store.is_locked("distributed-sync-mutex:rocket:1").unwrap());
    }

    /// Grants through the inner store but answers only after `delay`.
    struct SlowLockStore {
        inner: Arc<InMemoryLockStore>,
        delay: Duration,
    }

    #[async_trait]
    impl LockStore for SlowLockStore {
        async fn try_acquire(
            &self,
            name: &str,
            token: &str,
            expiry: Duration,
        ) -> Result<bool, LockStoreError> {
            let granted = self.inner.try_acquire(name, token, expiry).await?;
            tokio::time::sleep(self.delay).await;
            Ok(granted)
        }

        async fn release(&self, name: &str, token: &str) -> Result<bool, LockStoreError> {
            self.inner.release(name, token).await
        }
    }

    #[tokio::test]
    async fn test_timed_out_acquisition_does_not_leave_lock_held() {
        // Arrange
        let inner = Arc::new(InMemoryLockStore::new());
        let slow = SlowLockStore {
            inner: Arc::clone(&inner),
            delay: Duration::from_millis(200),
        };
        let options = MutexOptions {
            expiry: Duration::from_millis(500),
            timeout_factor: 0.1,
            ..fast_options()
        };
        let service = MutexService::new(Arc::new(slow), options);
        let invoked = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&invoked);

        // Act
        let result = service
            .with_lock("rocket:1", move || async move {
                flag.store(true, Ordering::SeqCst);
                Ok::<_, String>(())
            })
            .await;

        // Assert
        assert!(matches!(
            result,
            Err(MutexError::LockAcquisitionFailed {
                source: LockStoreError::Timeout(_),
                ..
            })
        ));
        assert!(!invoked.load(Ordering::SeqCst));
        assert!(!inner.is_locked("distributed-sync-mutex:rocket:1").unwrap());
    }

    #[test]
    fn test_lock_name_includes_service_prefix() {
        let store = Arc::new(InMemoryLockStore::new());
        let plain = service_over(Arc::clone(&store), MutexOptions::default());
        let prefixed = service_over(
            store,
            MutexOptions {
                service_prefix: Some("rockets".into()),
                ..MutexOptions::default()
            },
        );

        assert_eq!(plain.lock_name("rocket:1"), "distributed-sync-mutex:rocket:1");
        assert_eq!(
            prefixed.lock_name("rocket:1"),
            "distributed-sync-mutex:rockets:rocket:1"
        );
    }

    #[test]
    fn test_attempt_timeout_is_fraction_of_expiry() {
        let options = MutexOptions::default();

        assert_eq!(options.attempt_timeout(), Duration::from_millis(1500));
    }
}

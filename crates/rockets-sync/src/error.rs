//! Error types for lock stores and the mutex service.

use std::time::Duration;

use rockets_core::error::Severity;
use thiserror::Error;

/// A single lock-store round trip failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LockStoreError {
    /// The lock is currently held under another token.
    #[error("lock is held by another owner")]
    Contended,

    /// The lock is no longer held under the caller's token (expired or taken over).
    #[error("lock is not held by this owner")]
    NotHeld,

    /// The round trip exceeded the per-attempt timeout.
    #[error("lock store did not answer within {0:?}")]
    Timeout(Duration),

    /// The backing store reported an error.
    #[error("lock store backend error: {0}")]
    Backend(String),
}

/// Failure of a [`MutexService::with_lock`](crate::MutexService::with_lock)
/// call, distinct from the callback's own error.
#[derive(Debug, Error)]
pub enum MutexError {
    /// The lock could not be acquired within the retry budget; the callback
    /// was never invoked.
    #[error("an error occurred while acquiring lock {key}")]
    LockAcquisitionFailed {
        /// Fully qualified lock name.
        key: String,
        /// Last store error observed.
        #[source]
        source: LockStoreError,
    },

    /// The callback ran but the lock could not be released; it stays held
    /// until its natural expiry.
    #[error("an error occurred while releasing lock {key}")]
    LockReleaseFailed {
        /// Fully qualified lock name.
        key: String,
        /// Whether the callback returned `Ok` before the release failed.
        operation_succeeded: bool,
        /// Last store error observed.
        #[source]
        source: LockStoreError,
    },

    /// The task running the locked section was aborted before it completed.
    #[error("locked operation on {key} was aborted: {reason}")]
    OperationAborted {
        /// Fully qualified lock name.
        key: String,
        /// Panic or cancellation description.
        reason: String,
    },
}

impl MutexError {
    /// Returns the severity class of this error.
    ///
    /// A release failure outranks an acquisition failure: it stalls every
    /// later dispatch on the same key until the lock expires.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::LockAcquisitionFailed { .. } | Self::OperationAborted { .. } => Severity::Fatal,
            Self::LockReleaseFailed { .. } => Severity::Critical,
        }
    }

    /// Whether the callback ran to a successful end despite this failure.
    ///
    /// Only a failed release can follow a successful callback.
    #[must_use]
    pub fn operation_succeeded(&self) -> bool {
        matches!(
            self,
            Self::LockReleaseFailed {
                operation_succeeded: true,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_failure_is_more_severe_than_acquisition_failure() {
        let acquisition = MutexError::LockAcquisitionFailed {
            key: "k".into(),
            source: LockStoreError::Contended,
        };
        let release = MutexError::LockReleaseFailed {
            key: "k".into(),
            operation_succeeded: false,
            source: LockStoreError::NotHeld,
        };

        assert!(release.severity() > acquisition.severity());
        assert!(acquisition.severity().is_fatal());
    }

    #[test]
    fn test_only_release_failure_after_success_reports_operation_succeeded() {
        let committed = MutexError::LockReleaseFailed {
            key: "k".into(),
            operation_succeeded: true,
            source: LockStoreError::NotHeld,
        };
        let failed = MutexError::LockReleaseFailed {
            key: "k".into(),
            operation_succeeded: false,
            source: LockStoreError::NotHeld,
        };
        let never_ran = MutexError::LockAcquisitionFailed {
            key: "k".into(),
            source: LockStoreError::Contended,
        };

        assert!(committed.operation_succeeded());
        assert!(!failed.operation_succeeded());
        assert!(!never_ran.operation_succeeded());
    }
}

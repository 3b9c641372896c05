//! Deduplication error type.

use std::time::Duration;

use thiserror::Error;

/// A deduplication store round trip failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeduplicationError {
    /// The retention window cannot be represented by the store.
    #[error("invalid deduplication ttl: {0:?}")]
    InvalidTtl(Duration),

    /// The backing store reported an error.
    #[error("deduplication store error: {0}")]
    Backend(String),
}

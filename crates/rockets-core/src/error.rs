//! Domain error types.

use std::fmt;

use thiserror::Error;

/// How severe an error is, independently of where it surfaces.
///
/// `Fatal` and `Critical` mark infrastructure trouble (coordination store,
/// persistence) rather than bad input, and are logged at `error` level.
/// `Critical` is reserved for faults that can leave shared state held, such
/// as a lock that could not be released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Expected rejection of a caller's input.
    Info,
    /// Degraded but recoverable condition.
    Warning,
    /// Infrastructure fault.
    Fatal,
    /// Infrastructure fault that may stall other work until it expires.
    Critical,
}

impl Severity {
    /// Whether the error indicates infrastructure trouble.
    #[must_use]
    pub fn is_fatal(self) -> bool {
        self >= Self::Fatal
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Fatal => "fatal",
            Self::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An aggregate was not found, or has been soft-deleted.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(String),

    /// An aggregate with the same identifier already exists.
    #[error("aggregate already exists: {0}")]
    AlreadyExists(String),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Returns the severity class of this error.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::AggregateNotFound(_) | Self::AlreadyExists(_) | Self::Validation(_) => {
                Severity::Info
            }
            Self::Infrastructure(_) => Severity::Fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infrastructure_errors_are_fatal() {
        assert_eq!(
            DomainError::Infrastructure("store down".into()).severity(),
            Severity::Fatal
        );
    }

    #[test]
    fn test_input_errors_are_informational() {
        assert_eq!(
            DomainError::Validation("bad".into()).severity(),
            Severity::Info
        );
        assert_eq!(
            DomainError::AggregateNotFound("id".into()).severity(),
            Severity::Info
        );
    }

    #[test]
    fn test_severity_orders_fatal_highest() {
        assert!(Severity::Critical > Severity::Fatal);
        assert!(Severity::Fatal > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
        assert_eq!(Severity::Fatal.to_string(), "fatal");
        assert!(Severity::Critical.is_fatal());
        assert!(!Severity::Warning.is_fatal());
    }
}

//! Bus and handler error types.

use rockets_core::error::{DomainError, Severity};
use rockets_sync::MutexError;
use thiserror::Error;

/// Failure reported by a handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Handling failed in the domain.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The handler received an input kind it does not handle.
    #[error("handler received unexpected input {0}")]
    UnexpectedInput(&'static str),
}

/// Failure of a bus operation.
#[derive(Debug, Error)]
pub enum BusError {
    /// A handler is already registered for this discriminant.
    #[error("bus handler already registered for {input_type}")]
    HandlerAlreadyRegistered {
        /// Type discriminant.
        input_type: &'static str,
    },

    /// No handler is registered for this discriminant.
    #[error("bus handler not registered for {input_type}")]
    HandlerNotRegistered {
        /// Type discriminant.
        input_type: &'static str,
    },

    /// The registered handler does not accept this input kind.
    #[error("invalid input {input_type} provided to handler")]
    InvalidInputProvided {
        /// Type discriminant.
        input_type: &'static str,
    },

    /// The handler's output is not of the type the caller expects.
    #[error("invalid output received from handler for {input_type}, expected {expected}")]
    InvalidOutputReceived {
        /// Type discriminant.
        input_type: &'static str,
        /// Name of the type the caller expected.
        expected: &'static str,
    },

    /// The handler ran and failed.
    #[error("unprocessable bus input {input_type}")]
    Unprocessable {
        /// Type discriminant.
        input_type: &'static str,
        /// Handler failure.
        #[source]
        source: DomainError,
    },

    /// The lock around a blocking dispatch could not be coordinated.
    #[error("blocking dispatch of {input_type} failed")]
    Coordination {
        /// Type discriminant.
        input_type: &'static str,
        /// Mutex failure.
        #[source]
        source: MutexError,
    },
}

impl BusError {
    /// Returns the severity class of this error.
    ///
    /// Wiring faults are fatal. Handler and coordination failures inherit the
    /// severity of their cause.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::HandlerAlreadyRegistered { .. }
            | Self::HandlerNotRegistered { .. }
            | Self::InvalidInputProvided { .. }
            | Self::InvalidOutputReceived { .. } => Severity::Fatal,
            Self::Unprocessable { source, .. } => source.severity(),
            Self::Coordination { source, .. } => source.severity(),
        }
    }

    /// Whether the error is a wiring fault of the assembled system rather
    /// than a failure of one dispatch.
    #[must_use]
    pub fn is_wiring_fault(&self) -> bool {
        matches!(
            self,
            Self::HandlerAlreadyRegistered { .. }
                | Self::HandlerNotRegistered { .. }
                | Self::InvalidInputProvided { .. }
                | Self::InvalidOutputReceived { .. }
        )
    }

    /// Whether the handler ran and succeeded even though the dispatch
    /// failed. Only a lock that could not be released afterwards leads here.
    #[must_use]
    pub fn handler_succeeded(&self) -> bool {
        matches!(self, Self::Coordination { source, .. } if source.operation_succeeded())
    }
}

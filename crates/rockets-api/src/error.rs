//! Rockets API — error types.

use std::error::Error as StdError;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rockets_bus::BusError;
use rockets_core::error::DomainError;
use rockets_messaging::DeduplicationError;
use rockets_rocket::application::processor::ProcessingError;
use rockets_rocket::application::resolver::EventResolutionError;
use rockets_sync::LockStoreError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The lock store could not be reached.
    #[error("lock store error: {0}")]
    LockStore(#[from] LockStoreError),

    /// The deduplication store could not be reached.
    #[error("deduplication store error: {0}")]
    Deduplication(#[from] DeduplicationError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable messages, outermost first down the cause chain.
    pub errors: Vec<String>,
}

/// HTTP-layer error that implements `IntoResponse`.
#[derive(Debug)]
pub enum ApiError {
    /// Ingestion of a message failed.
    Processing(ProcessingError),
    /// A query could not be answered.
    Query(BusError),
}

impl From<ProcessingError> for ApiError {
    fn from(err: ProcessingError) -> Self {
        Self::Processing(err)
    }
}

impl From<BusError> for ApiError {
    fn from(err: BusError) -> Self {
        Self::Query(err)
    }
}

fn domain_status(err: &DomainError) -> (StatusCode, &'static str) {
    match err {
        DomainError::AggregateNotFound(_) => (StatusCode::NOT_FOUND, "aggregate_not_found"),
        DomainError::AlreadyExists(_) => (StatusCode::CONFLICT, "already_exists"),
        DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        DomainError::Infrastructure(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
        }
    }
}

fn bus_status(err: &BusError) -> (StatusCode, &'static str) {
    match err {
        BusError::Unprocessable { source, .. } => domain_status(source),
        BusError::Coordination { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "coordination_error"),
        BusError::HandlerAlreadyRegistered { .. }
        | BusError::HandlerNotRegistered { .. }
        | BusError::InvalidInputProvided { .. }
        | BusError::InvalidOutputReceived { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "wiring_error")
        }
    }
}

fn resolution_status(err: &EventResolutionError) -> (StatusCode, &'static str) {
    let code = match err {
        EventResolutionError::MalformedEnvelope(_) => "malformed_envelope",
        EventResolutionError::UnknownEventType(_) => "unknown_event_type",
        EventResolutionError::MalformedPayload { .. } => "malformed_payload",
    };
    (StatusCode::BAD_REQUEST, code)
}

impl ApiError {
    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Processing(ProcessingError::Resolution(e)) => resolution_status(e),
            Self::Processing(ProcessingError::Duplicate { .. }) => {
                (StatusCode::CONFLICT, "duplicate_event")
            }
            Self::Processing(ProcessingError::Deduplication { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "deduplication_error")
            }
            Self::Processing(ProcessingError::Aborted { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "processing_aborted")
            }
            Self::Processing(ProcessingError::Dispatch { source, .. }) | Self::Query(source) => {
                bus_status(source)
            }
        }
    }

    fn messages(&self) -> Vec<String> {
        let root: &(dyn StdError + 'static) = match self {
            Self::Processing(e) => e,
            Self::Query(e) => e,
        };
        std::iter::successors(Some(root), |&e| e.source())
            .map(ToString::to_string)
            .collect()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status();
        if let Self::Query(e) = &self {
            if status.is_server_error() {
                error!(error = ?e, severity = %e.severity(), "rocket query failed");
            }
        }

        let body = ErrorBody {
            error: error_code,
            errors: self.messages(),
        };

        (status, Json(body)).into_response()
    }
}

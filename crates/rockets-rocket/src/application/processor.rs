//! Ingestion pipeline for inbound rocket messages.
//!
//! `bytes -> resolve -> claim -> lock -> handle -> release -> settle`.
//! The dedup claim is an atomic insert-if-absent and is itself the duplicate
//! decision. A claim is kept only for an event whose handler succeeded; any
//! other dispatch failure releases it so that a redelivery can be retried.
//! Claim and dispatch run on their own task, so a caller dropped while
//! waiting for the lock never strands a claim.

use std::sync::Arc;
use std::time::Duration;

use rockets_bus::{Bus, BusError};
use rockets_core::error::Severity;
use rockets_core::message::Message;
use rockets_messaging::{
    Acknowledgement, DEFAULT_DEDUPLICATION_TTL, DeduplicationError, Deduplicator,
};
use rockets_sync::MutexService;
use thiserror::Error;
use tracing::field::Empty;
use tracing::{Instrument, Span, debug, error, info, instrument, warn};

use super::resolver::{EventResolutionError, resolve_bytes};
use crate::domain::events::RocketEvent;

/// Failure to process one inbound message.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The body could not be turned into a typed event.
    #[error(transparent)]
    Resolution(#[from] EventResolutionError),

    /// The event was already processed within the retention window.
    #[error("rocket event {event_id} is a duplicate")]
    Duplicate {
        /// Deterministic event identity.
        event_id: String,
    },

    /// The deduplication store could not be consulted.
    #[error("deduplication of rocket event {event_id} failed")]
    Deduplication {
        /// Deterministic event identity.
        event_id: String,
        /// Store failure.
        #[source]
        source: DeduplicationError,
    },

    /// The event handler or its lock failed.
    #[error("dispatch of rocket event {event_id} failed")]
    Dispatch {
        /// Deterministic event identity.
        event_id: String,
        /// Bus failure.
        #[source]
        source: BusError,
    },

    /// The task claiming and dispatching the event did not complete.
    #[error("processing of rocket event {event_id} was aborted: {reason}")]
    Aborted {
        /// Deterministic event identity.
        event_id: String,
        /// Panic or cancellation description.
        reason: String,
    },
}

impl ProcessingError {
    /// Returns the severity class of this error.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::Resolution(_) | Self::Duplicate { .. } => Severity::Info,
            Self::Deduplication { .. } | Self::Aborted { .. } => Severity::Fatal,
            Self::Dispatch { source, .. } => source.severity(),
        }
    }

    /// The event identity, once resolution succeeded.
    #[must_use]
    pub fn event_id(&self) -> Option<&str> {
        match self {
            Self::Resolution(_) => None,
            Self::Duplicate { event_id }
            | Self::Deduplication { event_id, .. }
            | Self::Dispatch { event_id, .. }
            | Self::Aborted { event_id, .. } => Some(event_id),
        }
    }
}

/// Runs inbound rocket messages through the ingestion pipeline.
#[derive(Clone)]
pub struct MessageProcessor {
    events: Arc<Bus<RocketEvent, ()>>,
    mutex: MutexService,
    deduplicator: Arc<dyn Deduplicator>,
    dedup_ttl: Duration,
}

impl MessageProcessor {
    /// Creates a processor retaining event identities for
    /// [`DEFAULT_DEDUPLICATION_TTL`].
    #[must_use]
    pub fn new(
        events: Arc<Bus<RocketEvent, ()>>,
        mutex: MutexService,
        deduplicator: Arc<dyn Deduplicator>,
    ) -> Self {
        Self {
            events,
            mutex,
            deduplicator,
            dedup_ttl: DEFAULT_DEDUPLICATION_TTL,
        }
    }

    /// Overrides the deduplication retention window.
    #[must_use]
    pub fn with_dedup_ttl(mut self, ttl: Duration) -> Self {
        self.dedup_ttl = ttl;
        self
    }

    /// Processes one message body and settles `ack` with the outcome.
    ///
    /// Returns the event identity on success.
    ///
    /// # Errors
    ///
    /// - `ProcessingError::Resolution` if the body is not a known event.
    /// - `ProcessingError::Duplicate` if the identity was already claimed.
    /// - `ProcessingError::Deduplication` if the dedup store failed.
    /// - `ProcessingError::Dispatch` if the handler or the lock failed.
    /// - `ProcessingError::Aborted` if the dispatching task did not complete.
    #[instrument(
        skip_all,
        fields(event_id = Empty, message_type = Empty, rocket_id = Empty)
    )]
    pub async fn process(
        &self,
        body: &[u8],
        ack: &Acknowledgement,
    ) -> Result<String, ProcessingError> {
        let outcome = self.run(body).await;
        match &outcome {
            Ok(event_id) => {
                ack.ack();
                info!(event_id = %event_id, "rocket message processed");
            }
            Err(e) => {
                ack.nack();
                log_rejection(e);
            }
        }
        outcome
    }

    async fn run(&self, body: &[u8]) -> Result<String, ProcessingError> {
        let event = resolve_bytes(body)?;
        let event_id = event.metadata.event_id.clone();
        let span = Span::current();
        span.record("event_id", event_id.as_str());
        span.record("message_type", event.message_type());
        span.record("rocket_id", event.metadata.rocket_id.as_str());

        let this = self.clone();
        tokio::spawn(async move { this.claim_and_dispatch(event).await }.instrument(span))
            .await
            .map_err(|e| ProcessingError::Aborted {
                event_id,
                reason: e.to_string(),
            })?
    }

    async fn claim_and_dispatch(&self, event: RocketEvent) -> Result<String, ProcessingError> {
        let event_id = event.metadata.event_id.clone();
        let claimed = self
            .deduplicator
            .try_claim(&event_id, self.dedup_ttl)
            .await
            .map_err(|source| ProcessingError::Deduplication {
                event_id: event_id.clone(),
                source,
            })?;
        if !claimed {
            return Err(ProcessingError::Duplicate { event_id });
        }

        match self.events.dispatch_blocking(&self.mutex, event).await {
            Ok(()) => Ok(event_id),
            Err(source) => {
                if source.handler_succeeded() {
                    error!(
                        event_id = %event_id,
                        "rocket event applied but its lock was not released; dedup claim kept"
                    );
                } else {
                    self.release_claim(&event_id).await;
                }
                Err(ProcessingError::Dispatch { event_id, source })
            }
        }
    }

    async fn release_claim(&self, event_id: &str) {
        match self.deduplicator.forget(event_id).await {
            Ok(()) => debug!(event_id, "dedup claim released after failed dispatch"),
            Err(e) => warn!(
                event_id,
                error = %e,
                "failed to release dedup claim; redelivery stays suppressed until it expires"
            ),
        }
    }
}

impl std::fmt::Debug for MessageProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageProcessor")
            .field("events", &self.events)
            .field("mutex", &self.mutex)
            .field("dedup_ttl", &self.dedup_ttl)
            .finish_non_exhaustive()
    }
}

fn log_rejection(e: &ProcessingError) {
    let severity = e.severity();
    match severity {
        Severity::Info => info!(error = %e, %severity, "rocket message rejected"),
        Severity::Warning => warn!(error = %e, %severity, "rocket message rejected"),
        Severity::Fatal | Severity::Critical => {
            error!(error = ?e, %severity, "rocket message processing failed");
        }
    }
}

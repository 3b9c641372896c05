//! Event resolver: untyped envelope to typed [`RocketEvent`].

use serde::de::DeserializeOwned;
use thiserror::Error;

use super::envelope::{RocketEnvelope, event_identity};
use crate::domain::events::{
    ROCKET_EVENT_TYPES, ROCKET_EXPLODED_EVENT_TYPE, ROCKET_LAUNCHED_EVENT_TYPE,
    ROCKET_MISSION_CHANGED_EVENT_TYPE, ROCKET_SPEED_DECREASED_EVENT_TYPE,
    ROCKET_SPEED_INCREASED_EVENT_TYPE, RocketEvent, RocketEventKind, RocketEventMetadata,
};

/// Failure to turn an inbound message into a typed event.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EventResolutionError {
    /// The body is not a JSON envelope.
    #[error("failed to parse rocket message envelope: {0}")]
    MalformedEnvelope(String),

    /// No event is known under this discriminant.
    #[error(
        "unable to resolve rocket event type {0:?}, expected one of {expected}",
        expected = ROCKET_EVENT_TYPES.join(", ")
    )]
    UnknownEventType(String),

    /// The metadata or payload does not match the event's shape.
    #[error("failed to parse {message_type} event: {reason}")]
    MalformedPayload {
        /// Type discriminant.
        message_type: String,
        /// Parser error.
        reason: String,
    },
}

/// Parses `body` as an envelope and resolves it by its own `messageType`.
///
/// # Errors
///
/// Returns `EventResolutionError::MalformedEnvelope` if `body` is not an
/// envelope, otherwise see [`resolve`].
pub fn resolve_bytes(body: &[u8]) -> Result<RocketEvent, EventResolutionError> {
    let envelope = RocketEnvelope::from_slice(body)
        .map_err(|e| EventResolutionError::MalformedEnvelope(e.to_string()))?;
    resolve(&envelope.metadata.message_type, &envelope)
}

/// Resolves `envelope` into the event registered under `message_type`.
///
/// # Errors
///
/// - `EventResolutionError::UnknownEventType` if `message_type` is not one
///   of the five rocket events.
/// - `EventResolutionError::MalformedPayload` if `messageTime` is present
///   but not RFC 3339, or the payload does not fit the event.
pub fn resolve(
    message_type: &str,
    envelope: &RocketEnvelope,
) -> Result<RocketEvent, EventResolutionError> {
    let kind = match message_type {
        ROCKET_LAUNCHED_EVENT_TYPE => RocketEventKind::Launched(payload(message_type, envelope)?),
        ROCKET_EXPLODED_EVENT_TYPE => RocketEventKind::Exploded(payload(message_type, envelope)?),
        ROCKET_MISSION_CHANGED_EVENT_TYPE => {
            RocketEventKind::MissionChanged(payload(message_type, envelope)?)
        }
        ROCKET_SPEED_INCREASED_EVENT_TYPE => {
            RocketEventKind::SpeedIncreased(payload(message_type, envelope)?)
        }
        ROCKET_SPEED_DECREASED_EVENT_TYPE => {
            RocketEventKind::SpeedDecreased(payload(message_type, envelope)?)
        }
        other => return Err(EventResolutionError::UnknownEventType(other.to_owned())),
    };

    let occurred_at = envelope
        .message_time()
        .map_err(|e| EventResolutionError::MalformedPayload {
            message_type: message_type.to_owned(),
            reason: format!("rocket message metadata time parsing failed: {e}"),
        })?;

    Ok(RocketEvent {
        metadata: RocketEventMetadata {
            event_id: event_identity(&envelope.metadata, occurred_at),
            rocket_id: envelope.metadata.channel.clone(),
            message_number: envelope.metadata.message_number,
            occurred_at,
        },
        kind,
    })
}

fn payload<T: DeserializeOwned>(
    message_type: &str,
    envelope: &RocketEnvelope,
) -> Result<T, EventResolutionError> {
    T::deserialize(&envelope.message).map_err(|e| EventResolutionError::MalformedPayload {
        message_type: message_type.to_owned(),
        reason: format!("content conversion failed: {e}"),
    })
}

//! Wire envelope of inbound rocket messages.
//!
//! ```json
//! {
//!   "metadata": {
//!     "channel": "193270a9-c9cf-404a-8f83-838e71d9ae67",
//!     "messageNumber": 1,
//!     "messageTime": "2022-02-02T19:39:02.86874+01:00",
//!     "messageType": "RocketLaunched"
//!   },
//!   "message": { "type": "Falcon-9", "launchSpeed": 500, "mission": "ARTEMIS" }
//! }
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::events::RocketEvent;

/// Identity millis of an envelope without a time (0001-01-01T00:00:00Z).
pub const UNSET_MESSAGE_TIME_MILLIS: i64 = -62_135_596_800_000;

/// Envelope metadata. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeMetadata {
    /// Target rocket.
    #[serde(default)]
    pub channel: String,
    /// Producer-side sequence number within the channel.
    #[serde(default)]
    pub message_number: u64,
    /// RFC 3339 timestamp. Absent or empty means "no time".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_time: Option<String>,
    /// Type discriminant, e.g. `RocketLaunched`.
    #[serde(default)]
    pub message_type: String,
}

/// Inbound message as delivered to `POST /messages`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RocketEnvelope {
    /// Routing and identity metadata.
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: EnvelopeMetadata,
    /// Type-specific payload, parsed by the resolver.
    #[serde(default)]
    pub message: serde_json::Value,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl RocketEnvelope {
    /// Parses an envelope from raw request bytes.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if `body` is not an envelope.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Rebuilds the wire envelope of a typed event.
    #[must_use]
    pub fn from_event(event: &RocketEvent) -> Self {
        Self {
            metadata: EnvelopeMetadata {
                channel: event.metadata.rocket_id.clone(),
                message_number: event.metadata.message_number,
                message_time: event
                    .metadata
                    .occurred_at
                    .map(|at| at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
                message_type: event.kind.event_type().to_owned(),
            },
            message: event.kind.to_payload(),
        }
    }

    /// Parses `messageTime`.
    ///
    /// # Errors
    ///
    /// Returns the parse error if a non-empty time is not RFC 3339.
    pub fn message_time(&self) -> Result<Option<DateTime<Utc>>, chrono::ParseError> {
        match self.metadata.message_time.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => Ok(Some(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))),
        }
    }

    /// Deterministic identity: `channel:lowercase(type):number:time-millis`.
    ///
    /// # Errors
    ///
    /// Returns the parse error if `messageTime` is not RFC 3339.
    pub fn event_id(&self) -> Result<String, chrono::ParseError> {
        Ok(event_identity(&self.metadata, self.message_time()?))
    }

    /// Identity without the time component: `channel:lowercase(type):number`.
    ///
    /// Earlier producers deduplicated on this form; two messages differing
    /// only in time collide under it.
    #[must_use]
    pub fn legacy_event_id(&self) -> String {
        format!(
            "{}:{}:{}",
            self.metadata.channel,
            self.metadata.message_type.to_lowercase(),
            self.metadata.message_number
        )
    }
}

/// Identity of the message described by `metadata` once its time is parsed.
#[must_use]
pub fn event_identity(metadata: &EnvelopeMetadata, message_time: Option<DateTime<Utc>>) -> String {
    let millis = message_time.map_or(UNSET_MESSAGE_TIME_MILLIS, |at| at.timestamp_millis());
    format!(
        "{}:{}:{}:{}",
        metadata.channel,
        metadata.message_type.to_lowercase(),
        metadata.message_number,
        millis
    )
}

//! Domain events for the Rocket context.
//!
//! Payload structs serialize to exactly the `message` object producers send,
//! so they double as the wire format.

use chrono::{DateTime, Utc};
use rockets_core::message::{BlockingMessage, Message};
use serde::{Deserialize, Serialize};

/// Type discriminant of [`RocketLaunched`].
pub const ROCKET_LAUNCHED_EVENT_TYPE: &str = "RocketLaunched";
/// Type discriminant of [`RocketExploded`].
pub const ROCKET_EXPLODED_EVENT_TYPE: &str = "RocketExploded";
/// Type discriminant of [`RocketMissionChanged`].
pub const ROCKET_MISSION_CHANGED_EVENT_TYPE: &str = "RocketMissionChanged";
/// Type discriminant of [`RocketSpeedIncreased`].
pub const ROCKET_SPEED_INCREASED_EVENT_TYPE: &str = "RocketSpeedIncreased";
/// Type discriminant of [`RocketSpeedDecreased`].
pub const ROCKET_SPEED_DECREASED_EVENT_TYPE: &str = "RocketSpeedDecreased";

/// Every discriminant the resolver knows.
pub const ROCKET_EVENT_TYPES: [&str; 5] = [
    ROCKET_LAUNCHED_EVENT_TYPE,
    ROCKET_EXPLODED_EVENT_TYPE,
    ROCKET_MISSION_CHANGED_EVENT_TYPE,
    ROCKET_SPEED_INCREASED_EVENT_TYPE,
    ROCKET_SPEED_DECREASED_EVENT_TYPE,
];

/// Emitted when a rocket is launched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RocketLaunched {
    /// Rocket model.
    #[serde(rename = "type")]
    pub rocket_type: String,
    /// Speed at launch.
    pub launch_speed: i64,
    /// Initial mission.
    pub mission: String,
}

/// Emitted when a rocket explodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RocketExploded {
    /// Explosion cause, e.g. `PRESSURE_VESSEL_FAILURE`.
    pub reason: String,
}

/// Emitted when a rocket switches mission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RocketMissionChanged {
    /// Mission flown from now on.
    pub new_mission: String,
}

/// Emitted when a rocket speeds up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RocketSpeedIncreased {
    /// Amount added to the speed.
    pub by: i64,
}

/// Emitted when a rocket slows down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RocketSpeedDecreased {
    /// Amount removed from the speed.
    pub by: i64,
}

/// Event payload variants for the Rocket context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RocketEventKind {
    /// A rocket has been launched.
    Launched(RocketLaunched),
    /// A rocket has exploded.
    Exploded(RocketExploded),
    /// A rocket changed mission.
    MissionChanged(RocketMissionChanged),
    /// A rocket sped up.
    SpeedIncreased(RocketSpeedIncreased),
    /// A rocket slowed down.
    SpeedDecreased(RocketSpeedDecreased),
}

impl RocketEventKind {
    /// The type discriminant of this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Launched(_) => ROCKET_LAUNCHED_EVENT_TYPE,
            Self::Exploded(_) => ROCKET_EXPLODED_EVENT_TYPE,
            Self::MissionChanged(_) => ROCKET_MISSION_CHANGED_EVENT_TYPE,
            Self::SpeedIncreased(_) => ROCKET_SPEED_INCREASED_EVENT_TYPE,
            Self::SpeedDecreased(_) => ROCKET_SPEED_DECREASED_EVENT_TYPE,
        }
    }

    /// Serializes the payload to its wire `message` object.
    #[must_use]
    pub fn to_payload(&self) -> serde_json::Value {
        let payload = match self {
            Self::Launched(p) => serde_json::to_value(p),
            Self::Exploded(p) => serde_json::to_value(p),
            Self::MissionChanged(p) => serde_json::to_value(p),
            Self::SpeedIncreased(p) => serde_json::to_value(p),
            Self::SpeedDecreased(p) => serde_json::to_value(p),
        };
        // Plain structs of strings and integers always serialize.
        payload.unwrap_or(serde_json::Value::Null)
    }
}

/// Envelope-derived facts shared by every rocket event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RocketEventMetadata {
    /// Deterministic identity used for deduplication.
    pub event_id: String,
    /// Target rocket, the envelope's channel.
    pub rocket_id: String,
    /// Producer-side sequence number within the channel.
    pub message_number: u64,
    /// When the event happened. `None` when the envelope carried no time.
    pub occurred_at: Option<DateTime<Utc>>,
}

/// A typed rocket event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RocketEvent {
    /// Event metadata.
    pub metadata: RocketEventMetadata,
    /// Event-specific payload.
    pub kind: RocketEventKind,
}

impl Message for RocketEvent {
    fn message_type(&self) -> &'static str {
        self.kind.event_type()
    }
}

impl BlockingMessage for RocketEvent {
    fn blocking_key(&self) -> String {
        format!("rocket:{}", self.metadata.rocket_id)
    }
}

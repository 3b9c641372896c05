//! Rockets Messaging — delivery-level concerns of inbound messages.
//!
//! - [`Deduplicator`](deduplicator::Deduplicator): suppresses re-processing of
//!   an event identity within a retention window.
//! - [`Acknowledgement`](acknowledgement::Acknowledgement): settles a delivery
//!   exactly once as acked or nacked.

pub mod acknowledgement;
pub mod deduplicator;
pub mod error;
pub mod in_memory;
pub mod redis_deduplicator;

pub use acknowledgement::{Acknowledgement, Settlement};
pub use deduplicator::{DEFAULT_DEDUPLICATION_TTL, Deduplicator};
pub use error::DeduplicationError;

//! Rockets Message Processor — Rocket bounded context.
//!
//! - `domain`: value objects, the `Rocket` aggregate and its state guard,
//!   the repository contract, creator / updater services and typed events.
//! - `application`: envelope resolution, event and query handlers wired into
//!   buses, and the `MessageProcessor` ingestion pipeline.
//! - `infrastructure`: the in-memory repository.

pub mod application;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
pub(crate) mod testing;

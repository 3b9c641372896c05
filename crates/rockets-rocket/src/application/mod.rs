//! Application layer for the Rocket context.

pub mod envelope;
pub mod event_handlers;
pub mod processor;
pub mod query_handlers;
pub mod resolver;

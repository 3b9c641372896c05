//! Rockets Core — shared domain abstractions.
//!
//! This crate defines the error taxonomy, the clock seam and the message
//! traits that the bus, the coordination primitives and the rocket context
//! depend on. It contains no infrastructure code.

pub mod clock;
pub mod error;
pub mod message;

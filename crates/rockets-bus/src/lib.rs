//! Rockets Bus — in-process dispatch registry.
//!
//! A [`Bus`] maps a message's type discriminant to exactly one [`Handler`].
//! Registration happens once, at startup, on a bus owned by the caller; the
//! finished bus is then shared read-only by every component that dispatches.

pub mod bus;
pub mod error;
pub mod handler;

pub use bus::Bus;
pub use error::{BusError, HandlerError};
pub use handler::Handler;

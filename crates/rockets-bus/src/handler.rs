//! Handler trait.

use async_trait::async_trait;

use crate::error::HandlerError;

/// Handles one kind of input routed through a [`Bus`](crate::Bus).
///
/// `I` is the closed set of messages the bus carries; a handler is only
/// invoked with inputs whose discriminant it was registered under.
#[async_trait]
pub trait Handler<I, O>: Send + Sync {
    /// Handles `input`.
    ///
    /// # Errors
    ///
    /// Returns `HandlerError::Domain` when handling fails, or
    /// `HandlerError::UnexpectedInput` when the bus was wired with this
    /// handler under the wrong discriminant.
    async fn handle(&self, input: I) -> Result<O, HandlerError>;
}

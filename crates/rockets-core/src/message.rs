//! Message abstractions shared by the dispatch registry and its callers.

/// Anything that can be routed through a bus by its type discriminant.
pub trait Message: Send + Sync + std::fmt::Debug {
    /// The type discriminant used to look up the registered handler.
    fn message_type(&self) -> &'static str;
}

/// A message whose handling mutates a single aggregate and must therefore be
/// serialized fleet-wide on a lock named by its blocking key.
pub trait BlockingMessage: Message {
    /// The lock name scoping mutual exclusion to one aggregate.
    fn blocking_key(&self) -> String;
}

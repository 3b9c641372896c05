//! Shared test doubles for the rockets message processor.

mod clock;
mod deduplicator;
mod lock_store;

pub use clock::ManualClock;
pub use deduplicator::FailingDeduplicator;
pub use lock_store::{FailingLockStore, UnreleasableLockStore};

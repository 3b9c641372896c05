//! Rockets Sync — distributed mutual exclusion.
//!
//! A [`MutexService`](mutex::MutexService) acquires a named, expiring lock in
//! a [`LockStore`](store::LockStore) shared by every instance of the service,
//! runs a callback while the lock is held and releases it afterwards. Both
//! acquisition and release go through the same bounded [`retry`] policy.

pub mod error;
pub mod in_memory;
pub mod mutex;
pub mod redis_store;
pub mod retry;
pub mod store;

pub use error::{LockStoreError, MutexError};
pub use mutex::{MutexOptions, MutexService};
pub use store::LockStore;

//! Delivery acknowledgement.
//!
//! A delivery starts `Pending` and settles exactly once, to `Acked` or
//! `Nacked`. Later settlement attempts are ignored. Consumers either poll
//! [`Acknowledgement::settlement`] or await [`Acknowledgement::settled`].

use std::sync::Arc;

use tokio::sync::watch;

/// Settlement state of one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Not yet settled.
    Pending,
    /// Processed; the producer must not redeliver.
    Acked,
    /// Rejected; the producer may redeliver.
    Nacked,
}

impl Settlement {
    /// Whether the delivery left `Pending`.
    #[must_use]
    pub fn is_settled(self) -> bool {
        self != Self::Pending
    }
}

/// Shared settlement handle for one delivery.
///
/// Clones observe and settle the same delivery.
#[derive(Debug, Clone)]
pub struct Acknowledgement {
    state: Arc<watch::Sender<Settlement>>,
}

impl Acknowledgement {
    /// Creates a pending acknowledgement.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(Settlement::Pending);
        Self {
            state: Arc::new(state),
        }
    }

    /// Settles as acked. Returns `false` if already settled.
    pub fn ack(&self) -> bool {
        self.settle(Settlement::Acked)
    }

    /// Settles as nacked. Returns `false` if already settled.
    pub fn nack(&self) -> bool {
        self.settle(Settlement::Nacked)
    }

    /// Current state, without waiting.
    #[must_use]
    pub fn settlement(&self) -> Settlement {
        *self.state.borrow()
    }

    /// Waits until the delivery is settled and returns the outcome.
    pub async fn settled(&self) -> Settlement {
        let mut receiver = self.state.subscribe();
        match receiver.wait_for(|state| state.is_settled()).await {
            Ok(state) => *state,
            Err(_) => self.settlement(),
        }
    }

    fn settle(&self, outcome: Settlement) -> bool {
        self.state.send_if_modified(|state| {
            if *state == Settlement::Pending {
                *state = outcome;
                true
            } else {
                false
            }
        })
    }
}

impl Default for Acknowledgement {
    fn default() -> Self {
        Self::new()
    }
}

//! Bounded retry with a jittered fixed delay.
//!
//! Used for both lock acquisition and lock release. Unlike an exponential
//! backoff the delay stays flat: contention on one aggregate clears as soon
//! as the current holder finishes.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{error, warn};

/// Retry budget for one coordination step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first. Values below 1 are
    /// treated as 1.
    pub attempts: u32,
    /// Base delay between two attempts.
    pub delay: Duration,
    /// Fraction of `delay` applied as uniform random jitter in both
    /// directions, in `[0.0, 1.0]`.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_millis(250),
            jitter: 0.05,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait before the next attempt, jitter applied.
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 || self.delay.is_zero() {
            return self.delay;
        }
        let factor = 1.0 + rand::rng().random_range(-jitter..=jitter);
        self.delay.mul_f64(factor)
    }
}

/// Runs `operation` until it succeeds or the policy's attempts are spent.
///
/// Returns the first success, or the error of the last attempt.
///
/// # Errors
///
/// Returns the last error produced by `operation` once every attempt failed.
pub async fn retry<F, Fut, T, E>(
    policy: &RetryPolicy,
    step: &'static str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => {
                error!(step, attempt, error = %err, "operation failed after max attempts");
                return Err(err);
            }
            Err(err) => {
                let delay = policy.next_delay();
                warn!(
                    step,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

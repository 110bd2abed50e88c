//! Bounded retry with fixed delay.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry policy for transient failures of asynchronous operations.
///
/// Runs an operation up to a bounded number of attempts with a fixed delay
/// between them. The delay does not grow between attempts, and the final
/// failure is surfaced to the caller exactly as the operation produced it.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy making at most `max_attempts` total attempts,
    /// `base_delay` apart.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Total attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay between attempts.
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Run `op`, retrying failures until the attempts are exhausted.
    ///
    /// The error type is the caller's own: the last attempt's error is
    /// returned unchanged, never wrapped.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Attempt failed, retrying after delay"
                    );
                    tokio::time::sleep(self.base_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

//! Bounded retry with linear backoff
//!
//! The policy only knows about [`TransportOutcome`]: an `Err` is retried, an
//! `Ok` (whatever status the replica answered with) ends the loop. It is the
//! only place the client sleeps.

use blockrep_common::{RetryConfig, TransportOutcome};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retry strategy shared by reads and writes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base: Duration,
    multiplier: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Create a policy; `max_attempts` is clamped to at least one
    #[must_use]
    pub fn new(max_attempts: u32, base: Duration, multiplier: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base,
            multiplier,
        }
    }

    #[must_use]
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.multiplier_ms),
        )
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the failed attempt with zero-based index `attempt`
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base.saturating_add(self.multiplier.saturating_mul(attempt))
    }

    /// Sum of all delays when every attempt fails
    #[must_use]
    pub fn total_delay(&self) -> Duration {
        (0..self.max_attempts)
            .map(|i| self.delay_for_attempt(i))
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    /// Run `op` until it returns `Ok` or the attempt budget is spent.
    ///
    /// Every failed attempt is followed by its backoff delay, including the
    /// last one, so a caller failing over to another replica starts after
    /// the full cool-down. The last transport error is returned when all
    /// attempts fail.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> TransportOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TransportOutcome<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    let delay = self.delay_for_attempt(attempt);
                    debug!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        ?delay,
                        "attempt failed: {e}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        return Err(e);
                    }
                }
            }
        }
    }
}

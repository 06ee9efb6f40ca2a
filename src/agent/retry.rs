//! Bounded retry with jitter-free exponential backoff.
//!
//! Only throttling ([`AgentError::is_transient`]) is retried. The wait before
//! retry `n` (1-based attempt that just failed) is `2^n + 1` seconds. Sleeping
//! goes through `tokio::time`, so tests drive it with a paused clock.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::AgentError;

/// Attempts for single-shot agent calls.
pub const SINGLE_SHOT_ATTEMPTS: u32 = 5;
/// Attempts for planning and aggregation calls.
pub const COORDINATION_ATTEMPTS: u32 = 3;

/// Retry budget for one call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Policy with the given attempt budget (at least one).
    #[must_use]
    pub const fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
        }
    }

    /// Budget for specialist plan and summary calls.
    #[must_use]
    pub const fn single_shot() -> Self {
        Self::new(SINGLE_SHOT_ATTEMPTS)
    }

    /// Budget for router, planner and aggregator calls.
    #[must_use]
    pub const fn coordination() -> Self {
        Self::new(COORDINATION_ATTEMPTS)
    }

    /// Wait after failed attempt `attempt` (1-based): `2^attempt + 1` seconds.
    #[must_use]
    pub fn delay(attempt: u32) -> Duration {
        let exp = 2_u64.saturating_pow(attempt);
        Duration::from_secs(exp.saturating_add(1))
    }

    /// Runs `op` until it succeeds, fails with a non-transient error, or the
    /// budget is spent. The last error is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns the error of the final attempt.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, AgentError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AgentError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let wait = Self::delay(attempt);
                    warn!(
                        call = label,
                        attempt,
                        max_attempts = self.max_attempts,
                        wait_secs = wait.as_secs(),
                        error = %err,
                        "rate limited, backing off"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::single_shot()
    }
}

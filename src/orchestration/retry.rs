//! Retry policy: decides after each attempt whether to try again, and how
//! long to wait before doing so.
//!
//! Only transient failures (and, by default, timeouts) are retried; a
//! permanent failure or an adapter crash spends the whole retry budget on
//! the first attempt. Backoff grows exponentially and is capped so a
//! misbehaving tool cannot stall the batch indefinitely.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::core::{ErrorKind, Job, Outcome};

/// Configurable retry/backoff policy, shared by every job in a batch.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the second attempt; doubles each retry.
    pub base_delay: Duration,
    /// Upper bound on the backoff delay.
    pub max_delay: Duration,
    /// Whether a timed-out attempt counts as transient.
    pub retry_on_timeout: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            retry_on_timeout: true,
        }
    }
}

impl RetryPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration, retry_on_timeout: bool) -> Self {
        Self {
            base_delay,
            max_delay,
            retry_on_timeout,
        }
    }

    /// Decide whether `job` should be attempted again after `outcome`.
    ///
    /// `attempts_so_far` counts the attempt that produced `outcome`.
    pub fn should_retry(&self, job: &Job, outcome: &Outcome, attempts_so_far: u32) -> bool {
        if attempts_so_far >= job.max_retries + 1 {
            return false;
        }
        match outcome {
            Outcome::Failure { kind, .. } => *kind == ErrorKind::Transient,
            Outcome::TimedOut { .. } => self.retry_on_timeout,
            Outcome::Success { .. } | Outcome::Cancelled => false,
        }
    }

    /// Backoff before attempt number `next_attempt` (2-based: the delay
    /// before the second attempt uses exponent 0).
    pub fn backoff_delay(&self, next_attempt: u32) -> Duration {
        let exponent = next_attempt.saturating_sub(2).min(31);
        let delay = self.base_delay.saturating_mul(1u32 << exponent);
        delay.min(self.max_delay)
    }

    /// Sleep out the backoff for `next_attempt`, returning false if the
    /// batch was cancelled before the delay elapsed.
    pub async fn wait_backoff(&self, next_attempt: u32, cancel: &CancellationToken) -> bool {
        let delay = self.backoff_delay(next_attempt);
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = cancel.cancelled() => false,
        }
    }
}

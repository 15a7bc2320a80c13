use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::ExponentialBackoff;

/// Classification of a failed attempt
pub trait Retryable {
    /// `false` for failures another attempt cannot fix
    fn is_retryable(&self) -> bool;
}

/// HTTP statuses blamed on the caller (400..500), never retried
pub fn is_client_error(status: u16) -> bool {
    (400..500).contains(&status)
}

/// Attempt budget and delay schedule of a retried operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

    /// `max_attempts` counts every attempt including the first; 0 is treated as 1.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_millis(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self::new(max_attempts, Duration::from_millis(base_delay_ms))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Wait after the failure of `attempt` (1-based): `base_delay * 2^(attempt - 1)`
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff().delay_for(attempt.saturating_sub(1))
    }

    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::uncapped(self.base_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_BASE_DELAY)
    }
}

/// Runs async operations under a `RetryPolicy`
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Invoke `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is spent. The last error is returned as is.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        let mut backoff = self.policy.backoff();
        let mut attempt: u32 = 1;

        loop {
            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if !error.is_retryable() {
                debug!(attempt, error = %error, "non-retryable failure");
                return Err(error);
            }

            if attempt >= self.policy.max_attempts {
                warn!(attempts = attempt, error = %error, "retry budget exhausted");
                return Err(error);
            }

            let delay = backoff.next_delay();
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "attempt failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Retry `operation` at most `max_attempts` times, waiting
/// `base_delay_ms * 2^(k-1)` after the k-th retryable failure.
pub async fn with_retry<T, E, F, Fut>(operation: F, max_attempts: u32, base_delay_ms: u64) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + fmt::Display,
{
    RetryExecutor::new(RetryPolicy::from_millis(max_attempts, base_delay_ms))
        .run(operation)
        .await
}

use std::time::Duration;

/// Delay schedule doubling from `initial` on every retry, capped at `max`
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
    retries_taken: u32,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            retries_taken: 0,
        }
    }

    /// Schedule without an upper bound
    pub fn uncapped(initial: Duration) -> Self {
        Self::new(initial, Duration::MAX)
    }

    /// Delay preceding retry number `retry` (0-based): `initial * 2^retry`
    pub fn delay_for(&self, retry: u32) -> Duration {
        2u32.checked_pow(retry)
            .and_then(|factor| self.initial.checked_mul(factor))
            .map_or(self.max, |delay| delay.min(self.max))
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.delay_for(self.retries_taken);
        self.retries_taken = self.retries_taken.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.retries_taken = 0;
    }

    pub fn retries_taken(&self) -> u32 {
        self.retries_taken
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000), Duration::from_secs(30))
    }
}

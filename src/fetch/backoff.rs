use crate::config::FetchConfig;
use std::time::Duration;

/// Exponential retry schedule
///
/// With the defaults (3 retries, 5s initial, 30s cap) an archive is requested
/// at most four times with 5s, 10s and 20s pauses in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    initial: Duration,
    max: Duration,
    max_retries: u32,
}

impl BackoffPolicy {
    pub fn new(initial: Duration, max: Duration, max_retries: u32) -> Self {
        Self {
            initial,
            max,
            max_retries,
        }
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(
            config.initial_backoff(),
            config.max_backoff(),
            config.max_retries,
        )
    }

    /// Total number of attempts, the first one included
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.initial
            .checked_mul(1u32 << exponent)
            .map_or(self.max, |delay| delay.min(self.max))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

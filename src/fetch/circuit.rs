use crate::config::CircuitConfig;

/// Breaker state derived from the consecutive failure count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Fetching normally
    Closed,
    /// Too many consecutive transient failures: issue no new fetches
    Degraded,
    /// Failure streak is critical: terminate the session
    Aborted,
}

/// Watches consecutive transient fetch failures
///
/// Every failed attempt counts, retries included. Permanent outcomes such as
/// a missing archive are not reported to the breaker at all, so they neither
/// extend nor reset a streak.
///
/// `Degraded` stops the orchestrator from starting new items while the item
/// in flight keeps its retry budget; `Aborted` also ends that item's retries.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    degrade_after: u32,
    abort_after: u32,
    consecutive_failures: u32,
}

impl CircuitBreaker {
    /// Creates a breaker; a `degrade_after` of 0 disables the degraded stage
    pub fn new(degrade_after: u32, abort_after: u32) -> Self {
        Self {
            degrade_after,
            abort_after,
            consecutive_failures: 0,
        }
    }

    pub fn from_config(config: &CircuitConfig) -> Self {
        Self::new(config.degrade_after, config.abort_after)
    }

    /// Records one fetch attempt: success resets the streak, failure extends it
    ///
    /// State changes are logged as `circuit_degraded`, `circuit_abort` or
    /// `circuit_closed`.
    pub fn record_outcome(&mut self, success: bool) {
        let before = self.state();
        if success {
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        }

        let after = self.state();
        if before == after {
            return;
        }
        let failures = self.consecutive_failures;
        match after {
            CircuitState::Degraded => tracing::error!(
                event = "circuit_degraded",
                consecutive_failures = failures,
                "Too many consecutive fetch failures, no new items will be fetched"
            ),
            CircuitState::Aborted => tracing::error!(
                event = "circuit_abort",
                consecutive_failures = failures,
                "Consecutive fetch failures reached the abort threshold"
            ),
            CircuitState::Closed => tracing::info!(
                event = "circuit_closed",
                "Fetch succeeded, failure streak cleared"
            ),
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn state(&self) -> CircuitState {
        if self.consecutive_failures >= self.abort_after {
            CircuitState::Aborted
        } else if self.degrade_after > 0 && self.consecutive_failures >= self.degrade_after {
            CircuitState::Degraded
        } else {
            CircuitState::Closed
        }
    }

    /// Whether new fetches must stop
    pub fn should_halt(&self) -> bool {
        self.state() != CircuitState::Closed
    }

    pub fn should_abort(&self) -> bool {
        self.state() == CircuitState::Aborted
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::from_config(&CircuitConfig::default())
    }
}

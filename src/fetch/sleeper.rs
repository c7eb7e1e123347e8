use crate::pipeline::SharedShutdown;
use async_trait::async_trait;
use std::time::Duration;

/// How an interruptible sleep ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepOutcome {
    Elapsed,
    Interrupted,
}

/// Source of the fetcher's pacing and backoff sleeps
///
/// Production code uses [`TokioSleeper`]; tests inject a recorder so backoff
/// schedules can be asserted without waiting.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration) -> SleepOutcome;
}

/// Sleeps on the Tokio timer, waking early when shutdown is requested
#[derive(Debug, Clone)]
pub struct TokioSleeper {
    shutdown: SharedShutdown,
}

impl TokioSleeper {
    pub fn new(shutdown: SharedShutdown) -> Self {
        Self { shutdown }
    }
}

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) -> SleepOutcome {
        if self.shutdown.is_requested() {
            return SleepOutcome::Interrupted;
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => SleepOutcome::Elapsed,
            _ = self.shutdown.wait() => SleepOutcome::Interrupted,
        }
    }
}

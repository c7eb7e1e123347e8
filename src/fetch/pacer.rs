use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Enforces a minimum spacing between outbound requests
///
/// One pacer is shared by every request of the process, so the spacing holds
/// across archive kinds and dates.
#[derive(Debug)]
pub struct RequestPacer {
    min_interval: Duration,
    last_request_time: Mutex<Option<Instant>>,
}

impl RequestPacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request_time: Mutex::new(None),
        }
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, now: Instant) -> Option<Duration> {
        let last = self.last_request()?;
        let elapsed = now.saturating_duration_since(last);
        (elapsed < self.min_interval).then(|| self.min_interval - elapsed)
    }

    /// Records that a request was sent at `now`
    pub fn record_request(&self, now: Instant) {
        if let Ok(mut last) = self.last_request_time.lock() {
            *last = Some(now);
        }
    }

    fn last_request(&self) -> Option<Instant> {
        self.last_request_time.lock().ok().and_then(|last| *last)
    }
}

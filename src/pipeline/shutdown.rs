//! Graceful stop signalling
//!
//! A [`Shutdown`] is raised by Ctrl-C or by the session timeout. Raising it
//! wakes every interruptible sleep; the orchestrator then stops issuing new
//! fetches and reports a partial summary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Shared handle to a shutdown signal
pub type SharedShutdown = Arc<Shutdown>;

/// Why a stop was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Interrupted,
    TimedOut,
}

#[derive(Debug, Default)]
pub struct Shutdown {
    requested: AtomicBool,
    timed_out: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedShutdown {
        Arc::new(Self::new())
    }

    /// Requests a stop. Only the first request wakes waiters.
    pub fn request(&self) {
        if !self.requested.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    fn request_timeout(&self) {
        self.timed_out.store(true, Ordering::SeqCst);
        self.request();
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn reason(&self) -> Option<StopReason> {
        if !self.is_requested() {
            None
        } else if self.timed_out.load(Ordering::SeqCst) {
            Some(StopReason::TimedOut)
        } else {
            Some(StopReason::Interrupted)
        }
    }

    /// Waits until a stop is requested. Returns immediately if already set.
    pub async fn wait(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent request is not lost
        notified.as_mut().enable();
        if self.is_requested() {
            return;
        }
        notified.await;
    }
}

/// Raises `shutdown` as a timeout once `limit` has elapsed
pub fn spawn_session_timer(
    shutdown: SharedShutdown,
    limit: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(limit) => {
                tracing::warn!(
                    event = "session_timeout",
                    limit_secs = limit.as_secs(),
                    "Session time limit reached, stopping after the current item"
                );
                shutdown.request_timeout();
            }
            _ = shutdown.wait() => {}
        }
    })
}

/// Raises `shutdown` on Ctrl-C
pub fn spawn_ctrl_c_handler(shutdown: SharedShutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    tracing::warn!(
                        event = "interrupted",
                        "Interrupt received, stopping after the current item"
                    );
                    shutdown.request();
                }
            }
            _ = shutdown.wait() => {}
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_returns_once_requested() {
        let shutdown = Shutdown::shared();
        let waiter = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { shutdown.wait().await })
        };

        shutdown.request();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(shutdown.reason(), Some(StopReason::Interrupted));
    }

    #[tokio::test]
    async fn test_wait_after_request_is_immediate() {
        let shutdown = Shutdown::new();
        shutdown.request();
        shutdown.request();
        tokio::time::timeout(Duration::from_millis(100), shutdown.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_session_timer_raises_timeout() {
        let shutdown = Shutdown::shared();
        let timer = spawn_session_timer(shutdown.clone(), Duration::from_millis(10));
        timer.await.unwrap();
        assert_eq!(shutdown.reason(), Some(StopReason::TimedOut));
    }

    #[test]
    fn test_no_reason_until_requested() {
        assert_eq!(Shutdown::new().reason(), None);
    }
}

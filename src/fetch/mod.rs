//! Archive acquisition
//!
//! This module contains everything between an [`ArchiveRequest`] and the raw
//! archive bytes:
//! - [`RateLimitedFetcher`]: single GET with timeout, retry and spacing
//! - [`RequestPacer`]: process-wide minimum interval between requests
//! - [`BackoffPolicy`]: exponential retry schedule
//! - [`Sleeper`]: injectable, interruptible sleeps
//! - [`CircuitBreaker`]: consecutive transient failure tracking
//!
//! [`ArchiveRequest`]: crate::archive::ArchiveRequest

mod backoff;
mod circuit;
mod fetcher;
mod pacer;
mod sleeper;

pub use backoff::BackoffPolicy;
pub use circuit::{CircuitBreaker, CircuitState};
pub use fetcher::{
    build_http_client, classify_status, FetchedArchive, RateLimitedFetcher, StatusClass,
};
pub use pacer::RequestPacer;
pub use sleeper::{SleepOutcome, Sleeper, TokioSleeper};

use thiserror::Error;

/// Errors that can occur while acquiring an archive
#[derive(Debug, Error)]
pub enum FetchError {
    /// Permanent: the source has no archive at this address
    #[error("archive not available (HTTP {status})")]
    NotAvailable { status: u16 },

    /// Retries exhausted (or cut short by the circuit breaker) on timeouts,
    /// connection errors or retryable statuses
    #[error("transient failure after {attempts} attempts: {cause}")]
    Transient { attempts: u32, cause: String },

    /// A status outside the known classes; not retried
    #[error("unexpected HTTP status {status}")]
    Unexpected { status: u16 },

    /// A pacing or backoff sleep was interrupted by shutdown
    #[error("fetch cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl FetchError {
    /// Number of HTTP attempts made before the error
    pub fn attempts(&self) -> u32 {
        match self {
            Self::NotAvailable { .. } | Self::Unexpected { .. } => 1,
            Self::Transient { attempts, .. } | Self::Cancelled { attempts } => *attempts,
            Self::Client(_) => 0,
        }
    }
}

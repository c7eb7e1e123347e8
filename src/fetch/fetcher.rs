//! HTTP fetcher implementation
//!
//! This module performs the archive downloads, including:
//! - Building the HTTP client with the configured user agent and timeout
//! - Process-wide request spacing
//! - Retry with exponential backoff for transient failures
//! - Classification of HTTP outcomes

use crate::archive::ArchiveRequest;
use crate::config::{FetchConfig, SourceConfig};
use crate::fetch::backoff::BackoffPolicy;
use crate::fetch::circuit::CircuitBreaker;
use crate::fetch::pacer::RequestPacer;
use crate::fetch::sleeper::{SleepOutcome, Sleeper};
use crate::fetch::FetchError;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Successfully downloaded archive bytes
#[derive(Debug, Clone)]
pub struct FetchedArchive {
    pub bytes: Bytes,
    /// Number of attempts it took, the successful one included
    pub attempts: u32,
}

/// How an HTTP status is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    /// The archive does not exist (yet); never retried
    NotAvailable,
    /// Worth retrying after a pause
    Retryable,
    /// Anything else; the item fails without retry
    Unexpected,
}

/// Classifies a response status
///
/// | Status | Class |
/// |--------|-------|
/// | 2xx | Success |
/// | 400, 401, 403, 404 | NotAvailable |
/// | 408, 429, 500, 502, 503, 504 | Retryable |
/// | other | Unexpected |
pub fn classify_status(status: StatusCode) -> StatusClass {
    match status.as_u16() {
        200..=299 => StatusClass::Success,
        400 | 401 | 403 | 404 => StatusClass::NotAvailable,
        408 | 429 | 500 | 502 | 503 | 504 => StatusClass::Retryable,
        _ => StatusClass::Unexpected,
    }
}

/// Result of a single HTTP attempt
enum Attempt {
    Done(Bytes),
    NotAvailable(u16),
    Unexpected(u16),
    Retryable(String),
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `source` - User agent settings
/// * `fetch` - Timeout settings
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    source: &SourceConfig,
    fetch: &FetchConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(source.user_agent.clone())
        .timeout(fetch.timeout())
        .connect_timeout(fetch.timeout().min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Downloads archives one at a time with spacing and retries
pub struct RateLimitedFetcher {
    client: Client,
    pacer: RequestPacer,
    backoff: BackoffPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl RateLimitedFetcher {
    pub fn new(
        client: Client,
        pacer: RequestPacer,
        backoff: BackoffPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            client,
            pacer,
            backoff,
            sleeper,
        }
    }

    /// Builds a fetcher from configuration
    pub fn from_config(
        source: &SourceConfig,
        fetch: &FetchConfig,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self, FetchError> {
        let client = build_http_client(source, fetch)?;
        Ok(Self::new(
            client,
            RequestPacer::new(fetch.min_interval()),
            BackoffPolicy::from_config(fetch),
            sleeper,
        ))
    }

    /// Fetches the archive behind `request`
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 2xx | Return the body |
    /// | HTTP 400/401/403/404 | Immediate → NotAvailable |
    /// | HTTP 408/429/500/502/503/504 | Retry with backoff |
    /// | Timeout / connection error | Retry with backoff |
    /// | Other status | Immediate → Unexpected |
    ///
    /// Exhausting the attempts yields `Transient` with the last cause. When
    /// a pacing or backoff sleep is interrupted by shutdown the fetch ends
    /// with `Cancelled`.
    ///
    /// Every transient attempt is reported to `breaker` and a success resets
    /// it. Once the breaker reaches its abort threshold no further retry is
    /// made and the fetch ends with `Transient` right away.
    pub async fn fetch(
        &self,
        request: &ArchiveRequest,
        breaker: &mut CircuitBreaker,
    ) -> Result<FetchedArchive, FetchError> {
        let date = request.date();
        let kind = request.kind();
        let max_attempts = self.backoff.max_attempts();

        for attempt in 1..=max_attempts {
            if let Some(wait) = self.pacer.time_until_next_request(Instant::now()) {
                tracing::trace!(wait_ms = wait.as_millis() as u64, "Waiting for request spacing");
                if self.sleeper.sleep(wait).await == SleepOutcome::Interrupted {
                    return Err(FetchError::Cancelled {
                        attempts: attempt - 1,
                    });
                }
            }

            self.pacer.record_request(Instant::now());
            tracing::info!(
                event = "fetch_attempt",
                %date,
                %kind,
                attempt,
                url = %request.url(),
                "Fetching archive"
            );

            let started = Instant::now();
            let outcome = self.attempt(request).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            let cause = match outcome {
                Attempt::Done(bytes) => {
                    breaker.record_outcome(true);
                    tracing::info!(
                        event = "fetch_success",
                        %date,
                        %kind,
                        attempt,
                        duration_ms,
                        bytes = bytes.len(),
                        "Archive downloaded"
                    );
                    return Ok(FetchedArchive {
                        bytes,
                        attempts: attempt,
                    });
                }
                Attempt::NotAvailable(status) => {
                    tracing::info!(
                        event = "fetch_not_available",
                        %date,
                        %kind,
                        attempt,
                        duration_ms,
                        status,
                        "Archive not available"
                    );
                    return Err(FetchError::NotAvailable { status });
                }
                Attempt::Unexpected(status) => {
                    tracing::warn!(
                        event = "fetch_failure",
                        %date,
                        %kind,
                        attempt,
                        duration_ms,
                        status,
                        "Unexpected HTTP status"
                    );
                    return Err(FetchError::Unexpected { status });
                }
                Attempt::Retryable(cause) => cause,
            };

            breaker.record_outcome(false);
            if attempt == max_attempts || breaker.should_abort() {
                tracing::warn!(
                    event = "fetch_failure",
                    %date,
                    %kind,
                    attempt,
                    duration_ms,
                    cause = %cause,
                    circuit_aborted = breaker.should_abort(),
                    "Giving up after transient failures"
                );
                return Err(FetchError::Transient {
                    attempts: attempt,
                    cause,
                });
            }

            let delay = self.backoff.delay_for_retry(attempt);
            tracing::warn!(
                event = "fetch_retry",
                %date,
                %kind,
                attempt,
                duration_ms,
                delay_ms = delay.as_millis() as u64,
                cause = %cause,
                "Transient failure, retrying"
            );

            if self.sleeper.sleep(delay).await == SleepOutcome::Interrupted {
                return Err(FetchError::Cancelled { attempts: attempt });
            }
        }

        // max_attempts is at least 1, so the loop always returns
        Err(FetchError::Transient {
            attempts: max_attempts,
            cause: "no attempt made".to_string(),
        })
    }

    async fn attempt(&self, request: &ArchiveRequest) -> Attempt {
        let response = match self.client.get(request.url().clone()).send().await {
            Ok(response) => response,
            Err(e) => return Attempt::Retryable(describe_transport_error(&e)),
        };

        let status = response.status();
        match classify_status(status) {
            StatusClass::Success => match response.bytes().await {
                Ok(bytes) => Attempt::Done(bytes),
                Err(e) => Attempt::Retryable(format!("body read failed: {}", e)),
            },
            StatusClass::NotAvailable => Attempt::NotAvailable(status.as_u16()),
            StatusClass::Retryable => Attempt::Retryable(format!("HTTP {}", status.as_u16())),
            StatusClass::Unexpected => Attempt::Unexpected(status.as_u16()),
        }
    }
}

fn describe_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timeout".to_string()
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    }
}

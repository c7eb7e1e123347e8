use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Kyotei-Archive
///
/// Every section is optional in the TOML file; missing sections fall back to
/// the defaults used for the public archive site.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub circuit: CircuitConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub publish: PublishConfig,
}

/// Archive source location and client identification
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Base URL under which the `K/` and `B/` archive trees live
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Request pacing and retry behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Minimum time between any two outbound requests (milliseconds)
    #[serde(rename = "min-interval-ms", default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first attempt for transient failures
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry (milliseconds); doubles per retry
    #[serde(rename = "initial-backoff-ms", default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound for a single backoff delay (milliseconds)
    #[serde(rename = "max-backoff-ms", default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

/// Circuit breaker thresholds (consecutive transient fetch failures)
#[derive(Debug, Clone, Deserialize)]
pub struct CircuitConfig {
    #[serde(rename = "degrade-after", default = "default_degrade_after")]
    pub degrade_after: u32,

    #[serde(rename = "abort-after", default = "default_abort_after")]
    pub abort_after: u32,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root directory of the CSV archive
    #[serde(rename = "data-dir", default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Session-wide limits
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Wall-clock limit for the whole run (seconds, 0 disables it)
    #[serde(rename = "timeout-secs", default)]
    pub timeout_secs: u64,

    /// Number of errors listed in the end-of-run summary
    #[serde(rename = "max-reported-errors", default = "default_max_reported_errors")]
    pub max_reported_errors: usize,
}

/// Git publishing of newly written CSV files
#[derive(Debug, Clone, Deserialize)]
pub struct PublishConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default = "default_branch")]
    pub branch: String,
}

impl FetchConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

impl SessionConfig {
    /// Returns the session timeout, or `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            degrade_after: default_degrade_after(),
            abort_after: default_abort_after(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 0,
            max_reported_errors: default_max_reported_errors(),
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            remote: default_remote(),
            branch: default_branch(),
        }
    }
}

fn default_base_url() -> String {
    "https://www1.mbrace.or.jp/od2".to_string()
}

fn default_user_agent() -> String {
    format!("kyotei-archive/{}", env!("CARGO_PKG_VERSION"))
}

fn default_min_interval_ms() -> u64 {
    3000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    5000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_degrade_after() -> u32 {
    5
}

fn default_abort_after() -> u32 {
    10
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_max_reported_errors() -> usize {
    10
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

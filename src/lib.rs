//! Kyotei-Archive: boat-race archive ingestion
//!
//! This crate downloads the daily race-result (K) and race-program (B)
//! archives published by the boat-race data site, unpacks the LZH payload,
//! decodes it from Shift_JIS, parses the fixed-width text into typed race
//! records and writes them as date-partitioned CSV files.

pub mod archive;
pub mod config;
pub mod convert;
pub mod fetch;
pub mod parse;
pub mod pipeline;
pub mod publish;
pub mod record;
pub mod storage;

use thiserror::Error;

/// Main error type for Kyotei-Archive operations
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] fetch::FetchError),

    #[error("Archive error: {0}")]
    Extract(#[from] archive::ExtractError),

    #[error("Parse error: {0}")]
    Parse(#[from] parse::ParseError),

    #[error("Conversion error: {0}")]
    Convert(#[from] convert::ConvertError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Publish error: {0}")]
    Publish(#[from] publish::PublishError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Kyotei-Archive operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use archive::{ArchiveKind, ArchiveRequest};
pub use config::Config;
pub use pipeline::{ConversionSession, KindSelection, Pipeline, RunMode, RunPlan, SessionOutcome};

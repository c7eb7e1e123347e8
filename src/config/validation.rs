use crate::config::types::{
    CircuitConfig, Config, FetchConfig, OutputConfig, PublishConfig, SourceConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_fetch_config(&config.fetch)?;
    validate_circuit_config(&config.circuit)?;
    validate_output_config(&config.output)?;
    validate_publish_config(&config.publish)?;
    Ok(())
}

fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.min_interval_ms < 1000 {
        return Err(ConfigError::Validation(format!(
            "min-interval-ms must be >= 1000ms, got {}ms",
            config.min_interval_ms
        )));
    }

    if config.timeout_secs < 1 || config.timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be between 1 and 300, got {}",
            config.timeout_secs
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.initial_backoff_ms > config.max_backoff_ms {
        return Err(ConfigError::Validation(format!(
            "initial-backoff-ms ({}) cannot exceed max-backoff-ms ({})",
            config.initial_backoff_ms, config.max_backoff_ms
        )));
    }

    Ok(())
}

/// `degrade-after = 0` disables the degraded stage; the breaker then goes
/// straight from closed to aborted.
fn validate_circuit_config(config: &CircuitConfig) -> Result<(), ConfigError> {
    if config.abort_after < 1 {
        return Err(ConfigError::Validation(
            "abort-after must be >= 1".to_string(),
        ));
    }

    if config.degrade_after > 0 && config.degrade_after >= config.abort_after {
        return Err(ConfigError::Validation(format!(
            "degrade-after ({}) must be lower than abort-after ({})",
            config.degrade_after, config.abort_after
        )));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "data-dir cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_publish_config(config: &PublishConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        return Ok(());
    }

    if config.remote.trim().is_empty() || config.branch.trim().is_empty() {
        return Err(ConfigError::Validation(
            "publish remote and branch cannot be empty when publishing is enabled".to_string(),
        ));
    }

    Ok(())
}

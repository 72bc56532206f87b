use crate::config::types::{Config, DispatcherConfig, HttpConfig, OutputConfig, UnitConfig};
use crate::ConfigError;
use url::Url;

/// Largest accepted think-time bound in seconds
pub const MAX_THINK_TIME: u64 = 600;

/// Largest accepted retry-backoff factor in seconds
pub const MAX_RETRY_BACKOFF: f64 = 120.0;

/// Largest accepted number of retries per request
pub const MAX_HTTP_RETRIES: u32 = 20;

/// Validates the global sections of the configuration
///
/// Units are checked one at a time by [`validate_unit`] when the dispatcher
/// builds them.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_output_config(&config.output)?;
    validate_dispatcher_config(&config.dispatcher)?;
    validate_http_config(&config.http)?;
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates worker pool configuration
fn validate_dispatcher_config(config: &DispatcherConfig) -> Result<(), ConfigError> {
    if config.concurrency == Some(0) {
        return Err(ConfigError::Validation(
            "concurrency must be >= 1, got 0".to_string(),
        ));
    }
    Ok(())
}

/// Validates HTTP client configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout must be >= 1s, got {}s",
            config.timeout
        )));
    }

    if config.connect_timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "connect-timeout must be >= 1s, got {}s",
            config.connect_timeout
        )));
    }

    if !config.user_agents.iter().any(|ua| !ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "at least one non-empty user agent is required".to_string(),
        ));
    }

    Ok(())
}

/// Validates a single crawl unit
///
/// # Arguments
///
/// * `unit` - The unit as read from the workload file
///
/// # Returns
///
/// * `Ok(())` - The unit can be crawled
/// * `Err(ConfigError)` - The unit is malformed and must be skipped
pub fn validate_unit(unit: &UnitConfig) -> Result<(), ConfigError> {
    if unit.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "unit name cannot be empty".to_string(),
        ));
    }

    if unit.targets.is_empty() {
        return Err(ConfigError::Validation(format!(
            "unit '{}' must have at least one target URL",
            unit.name
        )));
    }

    for target in &unit.targets {
        validate_target(target)?;
    }

    validate_patterns(&unit.name, "image-ignore-patterns", &unit.image_ignore_patterns)?;
    validate_patterns(&unit.name, "follow-href-patterns", &unit.follow_href_patterns)?;

    if !unit.retry_backoff.is_finite() || unit.retry_backoff < 0.0 {
        return Err(ConfigError::Validation(format!(
            "unit '{}': retry-backoff must be a non-negative number, got {}",
            unit.name, unit.retry_backoff
        )));
    }

    if unit.retry_backoff > MAX_RETRY_BACKOFF {
        return Err(ConfigError::Validation(format!(
            "unit '{}': retry-backoff must be <= {}s, got {}",
            unit.name, MAX_RETRY_BACKOFF, unit.retry_backoff
        )));
    }

    if unit.think_time > MAX_THINK_TIME {
        return Err(ConfigError::Validation(format!(
            "unit '{}': think-time must be <= {}s, got {}",
            unit.name, MAX_THINK_TIME, unit.think_time
        )));
    }

    if unit.http_retries > MAX_HTTP_RETRIES {
        return Err(ConfigError::Validation(format!(
            "unit '{}': http-retries must be <= {}, got {}",
            unit.name, MAX_HTTP_RETRIES, unit.http_retries
        )));
    }

    Ok(())
}

/// Validates that a target is an absolute HTTP(S) URL
fn validate_target(target: &str) -> Result<(), ConfigError> {
    let url = Url::parse(target)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid target URL '{}': {}", target, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Target URL '{}' must use the http or https scheme",
            target
        )));
    }

    Ok(())
}

/// Empty patterns would match every URL
fn validate_patterns(unit: &str, field: &str, patterns: &[String]) -> Result<(), ConfigError> {
    if patterns.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::InvalidPattern(format!(
            "unit '{}': {} cannot contain an empty pattern",
            unit, field
        )));
    }
    Ok(())
}

//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Endpoint base URL must be an http(s) URL")]
    InvalidBaseUrl,

    #[error("Channel URL must be an http(s) URL")]
    InvalidChannelUrl,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Retry attempts must be at least 1")]
    InvalidRetryAttempts,

    #[error("Reconnect delays must be non-zero with max_delay >= base_delay")]
    InvalidBackoff,

    #[error("Probe interval must be non-zero")]
    InvalidProbeInterval,

    #[error("Poll interval must be non-zero")]
    InvalidPollInterval,

    #[error("Poll check interval must be non-zero and shorter than the poll interval")]
    InvalidCheckInterval,

    #[error("Cache TTLs must be non-zero")]
    InvalidTtl,
}

/// True for absolute http or https URLs.
pub(crate) fn is_http_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    rest.is_some_and(|host| !host.is_empty() && !host.starts_with('/'))
}

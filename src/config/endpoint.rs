//! Upstream endpoint configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::{is_http_url, ValidationError};
use crate::adapters::{HttpTransportConfig, RetryPolicy};

/// Pull protocol endpoint and credentials
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    /// Base URL; resource paths such as `courses` are appended
    pub base_url: String,

    /// API key sent as `x-api-key`
    pub api_key: String,

    /// Optional bearer credential
    pub bearer_token: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Attempts per logical request, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait before the first retry; doubles on each further retry
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
}

impl EndpointConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn transport_config(&self) -> HttpTransportConfig {
        let mut config = HttpTransportConfig::new(self.base_url())
            .with_api_key(self.api_key.clone())
            .with_timeout(self.timeout());
        if let Some(token) = self.bearer_token.as_ref().filter(|t| !t.is_empty()) {
            config = config.with_bearer_token(token.clone());
        }
        config
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.retry_base_ms))
    }

    /// Validate endpoint configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_url.is_empty() {
            return Err(ValidationError::MissingRequired("ENDPOINT__BASE_URL"));
        }
        if !is_http_url(&self.base_url) {
            return Err(ValidationError::InvalidBaseUrl);
        }
        if self.api_key.is_empty() {
            return Err(ValidationError::MissingRequired("ENDPOINT__API_KEY"));
        }
        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.max_attempts == 0 {
            return Err(ValidationError::InvalidRetryAttempts);
        }
        Ok(())
    }
}

fn default_timeout() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base_ms() -> u64 {
    250
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EndpointConfig {
        EndpointConfig {
            base_url: "https://catalog.example.com/api/".to_string(),
            api_key: "key".to_string(),
            bearer_token: None,
            timeout_secs: default_timeout(),
            max_attempts: default_max_attempts(),
            retry_base_ms: default_retry_base_ms(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(config().validate().is_ok());
        assert_eq!(config().base_url(), "https://catalog.example.com/api");
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let config = EndpointConfig {
            base_url: "ftp://catalog".to_string(),
            ..config()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidBaseUrl));
    }

    #[test]
    fn test_requires_api_key() {
        let config = EndpointConfig {
            api_key: String::new(),
            ..config()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("ENDPOINT__API_KEY"))
        );
    }

    #[test]
    fn test_rejects_zero_attempts_and_bad_timeout() {
        let zero = EndpointConfig {
            max_attempts: 0,
            ..config()
        };
        assert_eq!(zero.validate(), Err(ValidationError::InvalidRetryAttempts));

        let slow = EndpointConfig {
            timeout_secs: 301,
            ..config()
        };
        assert_eq!(slow.validate(), Err(ValidationError::InvalidTimeout));
    }

    #[test]
    fn test_retry_policy() {
        let policy = config().retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
    }
}

//! Broadcast channel configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::{is_http_url, ValidationError};
use crate::application::{ChannelSettings, ExhaustedPolicy, ReconnectBackoff};

/// Push channel configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// Event stream URL; defaults to `{endpoint.base_url}/events`
    pub url: Option<String>,

    /// Named channel to join
    #[serde(default = "default_name")]
    pub name: String,

    /// First reconnect delay in milliseconds
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Reconnect delay ceiling in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Consecutive failed attempts before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Behaviour after the attempt budget is spent
    #[serde(default)]
    pub on_exhausted: ExhaustedMode,

    /// Probe period in seconds when `on_exhausted = probe`
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,
}

/// Give-up behaviour
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExhaustedMode {
    /// Stay disconnected until a manual reconnect
    #[default]
    Manual,
    /// Keep retrying at `probe_interval_secs`
    Probe,
}

impl ChannelConfig {
    /// Event stream URL for the given endpoint base
    pub fn url_for(&self, base_url: &str) -> String {
        match self.url.as_ref().filter(|u| !u.is_empty()) {
            Some(url) => url.clone(),
            None => format!("{}/events", base_url.trim_end_matches('/')),
        }
    }

    pub fn backoff(&self) -> ReconnectBackoff {
        ReconnectBackoff::new(
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
            self.max_attempts,
        )
    }

    pub fn exhausted_policy(&self) -> ExhaustedPolicy {
        match self.on_exhausted {
            ExhaustedMode::Manual => ExhaustedPolicy::Manual,
            ExhaustedMode::Probe => {
                ExhaustedPolicy::Probe(Duration::from_secs(self.probe_interval_secs))
            }
        }
    }

    pub fn settings(&self) -> ChannelSettings {
        ChannelSettings {
            backoff: self.backoff(),
            on_exhausted: self.exhausted_policy(),
        }
    }

    /// Validate channel configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingRequired("CHANNEL__NAME"));
        }
        if let Some(url) = self.url.as_ref().filter(|u| !u.is_empty()) {
            if !is_http_url(url) {
                return Err(ValidationError::InvalidChannelUrl);
            }
        }
        if self.base_delay_ms == 0 || self.max_delay_ms < self.base_delay_ms {
            return Err(ValidationError::InvalidBackoff);
        }
        if self.on_exhausted == ExhaustedMode::Probe && self.probe_interval_secs == 0 {
            return Err(ValidationError::InvalidProbeInterval);
        }
        Ok(())
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: None,
            name: default_name(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
            max_attempts: default_max_attempts(),
            on_exhausted: ExhaustedMode::default(),
            probe_interval_secs: default_probe_interval(),
        }
    }
}

fn default_name() -> String {
    "catalog".to_string()
}

fn default_base_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    30_000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_probe_interval() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_config_defaults() {
        let config = ChannelConfig::default();
        assert_eq!(config.name, "catalog");
        assert_eq!(config.on_exhausted, ExhaustedMode::Manual);
        assert!(config.validate().is_ok());
        assert_eq!(config.exhausted_policy(), ExhaustedPolicy::Manual);
    }

    #[test]
    fn test_url_defaults_to_events_path() {
        let config = ChannelConfig::default();
        assert_eq!(
            config.url_for("https://catalog.example.com/api/"),
            "https://catalog.example.com/api/events"
        );

        let explicit = ChannelConfig {
            url: Some("https://push.example.com/sse".to_string()),
            ..Default::default()
        };
        assert_eq!(explicit.url_for("https://ignored"), "https://push.example.com/sse");
    }

    #[test]
    fn test_probe_policy() {
        let config = ChannelConfig {
            on_exhausted: ExhaustedMode::Probe,
            probe_interval_secs: 120,
            ..Default::default()
        };
        assert_eq!(
            config.exhausted_policy(),
            ExhaustedPolicy::Probe(Duration::from_secs(120))
        );

        let zero = ChannelConfig {
            probe_interval_secs: 0,
            ..config
        };
        assert_eq!(zero.validate(), Err(ValidationError::InvalidProbeInterval));
    }

    #[test]
    fn test_rejects_inverted_delays() {
        let config = ChannelConfig {
            base_delay_ms: 5000,
            max_delay_ms: 1000,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidBackoff));
    }
}

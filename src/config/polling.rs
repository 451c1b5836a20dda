//! Fallback polling and debounce configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Polling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Forced refresh period while push is unavailable
    #[serde(default = "default_interval")]
    pub interval_ms: u64,

    /// Connection state sampling period
    #[serde(default = "default_check_interval")]
    pub check_interval_ms: u64,

    /// Debounce window for push-triggered refetches
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Validate polling configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval_ms == 0 {
            return Err(ValidationError::InvalidPollInterval);
        }
        if self.check_interval_ms == 0 || self.check_interval_ms >= self.interval_ms {
            return Err(ValidationError::InvalidCheckInterval);
        }
        Ok(())
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval(),
            check_interval_ms: default_check_interval(),
            debounce_ms: default_debounce(),
        }
    }
}

fn default_interval() -> u64 {
    30_000
}

fn default_check_interval() -> u64 {
    5_000
}

fn default_debounce() -> u64 {
    500
}

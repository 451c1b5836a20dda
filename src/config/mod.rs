//! Configuration loading
//!
//! Settings come from environment variables with the `CATALOG_SYNC` prefix;
//! nested values are separated by double underscores. A `.env` file is read
//! first when present.
//!
//! # Example
//!
//! ```no_run
//! use catalog_sync::config::SyncConfig;
//!
//! let config = SyncConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Pulling from {}", config.endpoint.base_url());
//! ```

mod cache;
mod channel;
mod endpoint;
mod error;
mod logging;
mod polling;

pub use cache::CacheConfig;
pub use channel::{ChannelConfig, ExhaustedMode};
pub use endpoint::EndpointConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::{LogFormat, LoggingConfig};
pub use polling::PollingConfig;

use serde::Deserialize;

use crate::adapters::SseConnectorConfig;
use crate::application::SyncSettings;

/// Root configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Pull protocol endpoint (required)
    pub endpoint: EndpointConfig,

    #[serde(default)]
    pub channel: ChannelConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SyncConfig {
    /// Load configuration from environment variables
    ///
    /// - `CATALOG_SYNC__ENDPOINT__BASE_URL=...` -> `endpoint.base_url`
    /// - `CATALOG_SYNC__POLLING__INTERVAL_MS=30000` -> `polling.interval_ms`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CATALOG_SYNC")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.endpoint.validate()?;
        self.channel.validate()?;
        self.polling.validate()?;
        self.cache.validate()?;
        Ok(())
    }

    /// Timing settings for the sync service
    pub fn settings(&self) -> SyncSettings {
        SyncSettings {
            poll_interval: self.polling.interval(),
            check_interval: self.polling.check_interval(),
            debounce: self.polling.debounce(),
            channel: self.channel.settings(),
        }
    }

    /// Event stream connector settings, sharing the endpoint credentials
    pub fn connector_config(&self) -> SseConnectorConfig {
        let url = self.channel.url_for(self.endpoint.base_url());
        let mut config = SseConnectorConfig::new(url, self.channel.name.clone())
            .with_api_key(self.endpoint.api_key.clone())
            .with_connect_timeout(self.endpoint.timeout());
        if let Some(token) = self.endpoint.bearer_token.as_ref().filter(|t| !t.is_empty()) {
            config = config.with_bearer_token(token.clone());
        }
        config
    }
}

//! Response cache configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::CacheTtls;

/// TTL per query family
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Seat counts, schedules, courses
    #[serde(default = "default_volatile_ttl")]
    pub volatile_ttl_secs: u64,

    /// Rarely-changing collections such as paths
    #[serde(default = "default_stable_ttl")]
    pub stable_ttl_secs: u64,

    /// Let upstream `Cache-Control` shorten the TTL
    #[serde(default = "default_honor_cache_control")]
    pub honor_cache_control: bool,
}

impl CacheConfig {
    pub fn ttls(&self) -> CacheTtls {
        CacheTtls {
            volatile: Duration::from_secs(self.volatile_ttl_secs),
            stable: Duration::from_secs(self.stable_ttl_secs),
            honor_cache_control: self.honor_cache_control,
        }
    }

    /// Validate cache configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.volatile_ttl_secs == 0 || self.stable_ttl_secs == 0 {
            return Err(ValidationError::InvalidTtl);
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            volatile_ttl_secs: default_volatile_ttl(),
            stable_ttl_secs: default_stable_ttl(),
            honor_cache_control: default_honor_cache_control(),
        }
    }
}

fn default_volatile_ttl() -> u64 {
    60
}

fn default_stable_ttl() -> u64 {
    300
}

fn default_honor_cache_control() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_defaults_match_adapter_defaults() {
        assert_eq!(CacheConfig::default().ttls(), CacheTtls::default());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = CacheConfig {
            volatile_ttl_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidTtl));
    }
}

//! Configuration types

use crate::{ArborResult, ConfigError};
use serde::{Deserialize, Serialize};

/// How cached scopes are dropped after a directory mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationStrategy {
    /// Drop every cached scope on any mutation
    Wholesale,
    /// Drop only scopes that contain a touched agent
    Targeted,
}

/// Scope cache settings. Keys left out of a `[cache]` table keep their
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub strategy: InvalidationStrategy,
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: InvalidationStrategy::Wholesale,
            max_entries: 10_000,
        }
    }
}

/// Master configuration struct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArborConfig {
    #[serde(default)]
    pub cache: CacheSettings,
}

impl ArborConfig {
    /// Configuration with the scope cache switched off.
    pub fn uncached() -> Self {
        Self {
            cache: CacheSettings {
                enabled: false,
                ..CacheSettings::default()
            },
        }
    }

    /// Parse and validate a TOML document.
    ///
    /// ```toml
    /// [cache]
    /// enabled = true
    /// strategy = "targeted"
    /// max_entries = 5000
    /// ```
    pub fn from_toml_str(raw: &str) -> ArborResult<Self> {
        let config: ArborConfig = toml::from_str(raw).map_err(|e| ConfigError::ParseFailed {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ArborResult<()> {
        if self.cache.enabled && self.cache.max_entries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.max_entries".to_string(),
                value: self.cache.max_entries.to_string(),
                reason: "must be greater than 0 when the cache is enabled".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

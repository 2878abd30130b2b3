//! Layered configuration for engine construction.
//!
//! Supports a `cache.toml` file and `ADAPTIVE_CACHE_*` environment
//! variables, in addition to passing values directly to
//! [`crate::Engine::new`] / [`crate::Engine::configure_adaptive_behavior`].
//!
//! # Priority (highest to lowest)
//!
//! 1. Environment variables (`ADAPTIVE_CACHE_*`)
//! 2. Configuration file (`cache.toml`)
//! 3. Default values
//!
//! This is a pure data/validation layer: it does not construct or own
//! an [`crate::Engine`].

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to parse configuration from its source.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A configuration value is outside its valid range.
    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue {
        /// Configuration key that failed validation.
        key: String,
        /// Validation error message.
        message: String,
    },
}

/// Engine construction parameters, loadable from file/env/defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Byte ceiling in megabytes.
    pub max_memory_mb: usize,
    /// Minimum logical size (KB) to consider compression.
    pub compression_threshold_kb: usize,
    /// Windowed accesses to qualify as hot.
    pub hot_key_threshold: usize,
    /// Maximum `compressed/logical` ratio to accept compression.
    pub compression_ratio_target: f64,
    /// Whether the Sweeper invokes the Preload Hint Provider.
    pub enable_predictive_loading: bool,
    /// Sweeper cadence in milliseconds.
    pub sweep_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_memory_mb: 256,
            compression_threshold_kb: 4,
            hot_key_threshold: 100,
            compression_ratio_target: 0.7,
            enable_predictive_loading: false,
            sweep_interval_ms: 1_000,
        }
    }
}

impl CacheConfig {
    /// Loads configuration from `cache.toml` in the current directory,
    /// falling back to defaults if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but fails to parse, or if
    /// an environment override is malformed.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("cache.toml")
    }

    /// Loads configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file fails to parse.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("ADAPTIVE_CACHE_").split("_").lowercase(false));

        let config: Self = figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes this configuration back to a `cache.toml`-compatible
    /// string, e.g. to write out a starting point for operators to edit.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseError`] if serialization fails (not
    /// expected for this type, whose fields are all primitives).
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validates that all values are within sane, non-degenerate ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_memory_mb == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_memory_mb".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        if self.hot_key_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                key: "hot_key_threshold".to_string(),
                message: "must be greater than 0 (0 would classify every key as hot immediately)"
                    .to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.compression_ratio_target) {
            return Err(ConfigError::InvalidValue {
                key: "compression_ratio_target".to_string(),
                message: format!(
                    "value {} is out of range (0.0, 1.0]",
                    self.compression_ratio_target
                ),
            });
        }

        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "sweep_interval_ms".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

//! Service configuration.
//!
//! Loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;

use fixparts_core::DEFAULT_BARCODE_ATTEMPTS;

/// Tunables for the managers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// How many generated barcodes are tried before giving up (default: 5)
    pub barcode_attempts: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            barcode_attempts: DEFAULT_BARCODE_ATTEMPTS,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// ## Environment Variables
    /// - `FIXPARTS_BARCODE_ATTEMPTS`: barcode generation attempts, at least 1
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`ServiceConfig::from_env`] with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ServiceConfig::default();

        if let Some(raw) = lookup("FIXPARTS_BARCODE_ATTEMPTS") {
            config.barcode_attempts = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("FIXPARTS_BARCODE_ATTEMPTS".to_string()))?;
        }

        if config.barcode_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "FIXPARTS_BARCODE_ATTEMPTS".to_string(),
            ));
        }

        Ok(config)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

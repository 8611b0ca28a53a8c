//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TAMARIND_API_BASE_URL` - Base URL of the storefront backend API
//!
//! ## Optional
//! - `TAMARIND_DATA_DIR` - Directory for the persistent local store
//!   (in-memory storage when unset)
//! - `TAMARIND_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 30)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend API.
    pub api_base_url: Url,
    /// Directory backing the persistent local store. `None` keeps the
    /// cart, favorites, and session in memory only.
    pub data_dir: Option<PathBuf>,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = get_required_env("TAMARIND_API_BASE_URL")?
            .parse::<Url>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("TAMARIND_API_BASE_URL".to_string(), e.to_string())
            })?;
        let data_dir = get_optional_env("TAMARIND_DATA_DIR").map(PathBuf::from);
        let timeout_secs = get_env_or_default(
            "TAMARIND_HTTP_TIMEOUT_SECS",
            &DEFAULT_HTTP_TIMEOUT_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("TAMARIND_HTTP_TIMEOUT_SECS".to_string(), e.to_string())
        })?;

        Ok(Self {
            api_base_url,
            data_dir,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Construct a configuration directly, for tests and embedders that do
    /// not use environment variables.
    #[must_use]
    pub fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            data_dir: None,
            request_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults() {
        let config = ClientConfig::new(Url::parse("https://api.shop.example").unwrap());
        assert!(config.data_dir.is_none());
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_config_error_display() {
        assert_eq!(
            ConfigError::MissingEnvVar("TAMARIND_API_BASE_URL".to_string()).to_string(),
            "Missing environment variable: TAMARIND_API_BASE_URL"
        );
        assert_eq!(
            ConfigError::InvalidEnvVar("TAMARIND_HTTP_TIMEOUT_SECS".to_string(), "bad".to_string())
                .to_string(),
            "Invalid environment variable TAMARIND_HTTP_TIMEOUT_SECS: bad"
        );
    }
}

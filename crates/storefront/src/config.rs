//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `PVA_MARKET_API_URL` - Base URL of the order service (default: <http://127.0.0.1:3001>)
//! - `PVA_MARKET_DATA_DIR` - Directory for persisted cart/user/theme (default: .pva-market)
//! - `PVA_MARKET_API_TIMEOUT_SECS` - Request timeout in seconds (default: none)
//! - `PVA_MARKET_LOG_FORMAT` - `json` for JSON log lines (default: human-readable)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//!
//! A `backend-url` slot in the persisted store overrides `PVA_MARKET_API_URL`;
//! see [`StorefrontConfig::resolve_api_url`].

use std::path::PathBuf;
use std::time::Duration;

use pva_market_core::storage::{self, KeyValueStore, keys};
use thiserror::Error;
use tracing::warn;
use url::Url;

const DEFAULT_API_URL: &str = "http://127.0.0.1:3001";
const DEFAULT_DATA_DIR: &str = ".pva-market";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Base URL of the remote order service
    pub api_url: Url,
    /// Directory holding the durable key-value slots
    pub data_dir: PathBuf,
    /// Per-request timeout; `None` waits indefinitely
    pub api_timeout: Option<Duration>,
    /// Log line format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` for an unparseable URL, timeout
    /// or log format.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = parse_url(
            "PVA_MARKET_API_URL",
            &get_or_default(&lookup, "PVA_MARKET_API_URL", DEFAULT_API_URL),
        )?;
        let data_dir = PathBuf::from(get_or_default(
            &lookup,
            "PVA_MARKET_DATA_DIR",
            DEFAULT_DATA_DIR,
        ));

        let api_timeout = get_optional(&lookup, "PVA_MARKET_API_TIMEOUT_SECS")
            .map(|raw| parse_secs("PVA_MARKET_API_TIMEOUT_SECS", &raw))
            .transpose()?;

        let log_format = match get_optional(&lookup, "PVA_MARKET_LOG_FORMAT").as_deref() {
            None | Some("pretty" | "text") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidEnvVar(
                    "PVA_MARKET_LOG_FORMAT".to_string(),
                    format!("expected 'json' or 'pretty', got '{other}'"),
                ));
            }
        };

        Ok(Self {
            api_url,
            data_dir,
            api_timeout,
            log_format,
            sentry_dsn: get_optional(&lookup, "SENTRY_DSN"),
            sentry_environment: get_optional(&lookup, "SENTRY_ENVIRONMENT"),
        })
    }

    /// The backend URL to use: the persisted override if one is stored and
    /// valid, otherwise the configured one.
    #[must_use]
    pub fn resolve_api_url(&self, store: &dyn KeyValueStore) -> Url {
        let Some(raw) = storage::load::<String>(store, keys::BACKEND_URL) else {
            return self.api_url.clone();
        };
        match parse_url(keys::BACKEND_URL, &raw) {
            Ok(url) => url,
            Err(e) => {
                warn!(value = %raw, error = %e, "Ignoring invalid backend override");
                self.api_url.clone()
            }
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional variable, treating blank values as absent.
fn get_optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|value| !value.trim().is_empty())
}

/// Get a variable with a default value.
fn get_or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    get_optional(lookup, key).unwrap_or_else(|| default.to_string())
}

/// Parse an absolute http(s) URL.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` naming `key` if the URL is invalid.
pub fn parse_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

/// Parse a positive number of seconds.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` naming `key` for zero or non-numbers.
pub fn parse_secs(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    let secs = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use pva_market_core::MemoryStore;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.api_url.as_str(), "http://127.0.0.1:3001/");
        assert_eq!(config.data_dir, PathBuf::from(".pva-market"));
        assert_eq!(config.api_timeout, None);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_timeout_and_json_logs() {
        let config = config_from(&[
            ("PVA_MARKET_API_TIMEOUT_SECS", "15"),
            ("PVA_MARKET_LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(config.api_timeout, Some(Duration::from_secs(15)));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            config_from(&[("PVA_MARKET_API_URL", "not a url")]),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(matches!(
            config_from(&[("PVA_MARKET_API_URL", "ftp://example.com")]),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(matches!(
            config_from(&[("PVA_MARKET_API_TIMEOUT_SECS", "0")]),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(matches!(
            config_from(&[("PVA_MARKET_LOG_FORMAT", "xml")]),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = config_from(&[("PVA_MARKET_API_URL", "  "), ("SENTRY_DSN", "")]).unwrap();
        assert_eq!(config.api_url.as_str(), "http://127.0.0.1:3001/");
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_backend_override_wins() {
        let config = config_from(&[]).unwrap();
        let store = MemoryStore::new();
        assert_eq!(config.resolve_api_url(&store), config.api_url);

        storage::save(&store, keys::BACKEND_URL, "https://shop.example.com").unwrap();
        assert_eq!(
            config.resolve_api_url(&store).as_str(),
            "https://shop.example.com/"
        );
    }

    #[test]
    fn test_invalid_override_falls_back() {
        let config = config_from(&[]).unwrap();
        let store = MemoryStore::with_slots([(keys::BACKEND_URL, "\"::nope::\"")]);
        assert_eq!(config.resolve_api_url(&store), config.api_url);
    }

    #[test]
    fn test_non_http_override_falls_back() {
        let config = config_from(&[]).unwrap();
        let store = MemoryStore::new();
        storage::save(&store, keys::BACKEND_URL, "ftp://shop.example.com").unwrap();
        assert_eq!(config.resolve_api_url(&store), config.api_url);

        storage::save(&store, keys::BACKEND_URL, " https://shop.example.com ").unwrap();
        assert_eq!(
            config.resolve_api_url(&store).as_str(),
            "https://shop.example.com/"
        );
    }
}

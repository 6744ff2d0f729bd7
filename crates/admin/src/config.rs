//! Admin console configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `PVA_MARKET_POLL_INTERVAL_SECS` - Seconds between order polls (default: 5)
//! - `PVA_MARKET_ADMIN_PASSWORD` - Admin password for non-interactive use

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Admin console configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct AdminConfig {
    /// Time between background order polls
    pub poll_interval: Duration,
    /// Admin password, if supplied through the environment
    pub admin_password: Option<SecretString>,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("poll_interval", &self.poll_interval)
            .field(
                "admin_password",
                &self.admin_password.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            admin_password: None,
        }
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` for a non-positive poll interval.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` for a non-positive poll interval.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let poll_interval = match lookup("PVA_MARKET_POLL_INTERVAL_SECS") {
            Some(raw) if !raw.trim().is_empty() => {
                let secs = raw.trim().parse::<u64>().map_err(|e| {
                    ConfigError::InvalidEnvVar(
                        "PVA_MARKET_POLL_INTERVAL_SECS".to_string(),
                        e.to_string(),
                    )
                })?;
                if secs == 0 {
                    return Err(ConfigError::InvalidEnvVar(
                        "PVA_MARKET_POLL_INTERVAL_SECS".to_string(),
                        "must be greater than zero".to_string(),
                    ));
                }
                Duration::from_secs(secs)
            }
            _ => Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        };

        let admin_password = lookup("PVA_MARKET_ADMIN_PASSWORD")
            .filter(|value| !value.is_empty())
            .map(SecretString::from);

        Ok(Self {
            poll_interval,
            admin_password,
        })
    }

    /// The configured admin password.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` when none was supplied.
    pub fn require_password(&self) -> Result<SecretString, ConfigError> {
        self.admin_password
            .clone()
            .ok_or_else(|| ConfigError::MissingEnvVar("PVA_MARKET_ADMIN_PASSWORD".to_string()))
    }
}

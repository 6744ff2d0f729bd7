//! Wiring shared by every command: the durable store, the HTTP client and
//! the storefront built on top of them.

use std::sync::Arc;

use pva_market_admin::{AdminConfig, AdminError};
use pva_market_core::{ApiError, HttpStoreApi, StorageError};
use pva_market_storefront::persistence::FileStore;
use pva_market_storefront::{AppError, Storefront, StorefrontConfig, config};
use thiserror::Error;

/// Everything a command can fail with.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error(transparent)]
    Admin(#[from] AdminError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Admin configuration error: {0}")]
    AdminConfig(#[from] pva_market_admin::config::ConfigError),

    #[error("Cannot create API client: {0}")]
    Client(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CliError {
    /// Log the failure; server-class errors also go to Sentry.
    pub fn report(&self) {
        match self {
            Self::App(e) => e.report(),
            Self::Admin(e) => e.report(),
            other => tracing::warn!(error = %other, "Command rejected"),
        }
    }

    /// Message safe to show the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::App(e) => e.user_message(),
            Self::Admin(e) if e.suggests_backend_override() => {
                format!("{e}. Use `pva-cli config set-backend <url>` to point at another server.")
            }
            other => other.to_string(),
        }
    }
}

pub struct Context {
    config: StorefrontConfig,
    store: Arc<FileStore>,
    api: Arc<HttpStoreApi>,
    storefront: Storefront,
}

impl Context {
    /// Open the data directory and build the client against the effective
    /// backend URL.
    pub fn open(config: StorefrontConfig) -> Result<Self, CliError> {
        let store = Arc::new(FileStore::open(&config.data_dir)?);
        let api_url = config.resolve_api_url(store.as_ref());
        let api = Arc::new(HttpStoreApi::new(api_url.as_str(), config.api_timeout)?);
        tracing::debug!(api_url = %api.base_url(), data_dir = %store.dir().display(), "Context ready");

        let storefront = Storefront::init(api.clone(), store.clone());
        Ok(Self {
            config,
            store,
            api,
            storefront,
        })
    }

    pub const fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn api(&self) -> Arc<HttpStoreApi> {
        Arc::clone(&self.api)
    }

    pub const fn storefront(&self) -> &Storefront {
        &self.storefront
    }

    pub fn admin_config() -> Result<AdminConfig, CliError> {
        Ok(AdminConfig::from_env()?)
    }

    /// Flush the storefront slots. Failures are logged; the command already
    /// ran.
    pub fn shutdown(&self) {
        if let Err(e) = self.storefront.shutdown() {
            tracing::warn!(error = %e, "Failed to flush local state");
        }
    }
}

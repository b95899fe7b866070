//! Application context shared by the CLI commands and the bot.
//!
//! Holds the configuration, the Base RPC provider and, when `DATABASE_URL`
//! is set, the database pool.

use crate::config::Config;
use crate::utils::db_connect::{create_pool, DbPool};
use alloy::{
    network::Ethereum,
    providers::{Provider, ProviderBuilder, RootProvider},
};
use eyre::{Error, Result};
use url::Url;

/// Application context holding shared connections.
pub struct AppContext {
    /// Loaded configuration
    pub config: Config,
    /// Base network connection over HTTP
    pub provider: RootProvider<Ethereum>,
    /// Database pool, if persistence is configured
    pub db: Option<DbPool>,
}

impl AppContext {
    /// Creates a new application context from a loaded config.
    ///
    /// # Errors
    /// * If the database pool cannot be built
    pub fn new(config: Config) -> Result<Self, Error> {
        let provider = Self::http_provider(config.rpc_url.clone());
        let db = match config.database_url.as_deref() {
            Some(url) => Some(create_pool(url, config.db_pool_size)?),
            None => {
                log::warn!("utils::app_context: DATABASE_URL not set, persistence disabled");
                None
            }
        };
        Ok(Self {
            config,
            provider,
            db,
        })
    }

    /// Creates a provider for the HTTP endpoint at `url`.
    #[must_use]
    pub fn http_provider(url: Url) -> RootProvider<Ethereum> {
        let provider = ProviderBuilder::new().on_http(url);
        (*provider.root()).clone()
    }

    /// The database pool, or an error for commands that need one.
    ///
    /// # Errors
    /// * If `DATABASE_URL` is not set
    pub fn db(&self) -> Result<&DbPool> {
        self.db
            .as_ref()
            .ok_or_else(|| Error::msg("DATABASE_URL must be set"))
    }
}

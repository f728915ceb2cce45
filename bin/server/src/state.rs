//! Shared application state.

use crate::config::ServerConfig;
use habbiter_platform_access::{CredentialVerifier, SessionIssuer};
use habbiter_telegram::BotApi;
use sqlx::PgPool;

/// State shared by every handler and the reconciler.
pub struct AppState {
    /// Database connection pool.
    pub db_pool: PgPool,
    /// Telegram Bot API client.
    pub bot: BotApi,
    /// Login signature verifier.
    pub verifier: CredentialVerifier,
    /// Session token issuer.
    pub issuer: SessionIssuer,
    /// Loaded configuration.
    pub config: ServerConfig,
}

impl AppState {
    /// Creates the application state from configuration.
    #[must_use]
    pub fn new(db_pool: PgPool, config: ServerConfig) -> Self {
        Self {
            db_pool,
            bot: BotApi::new(&config.bot.token),
            verifier: CredentialVerifier::new(&config.bot.token),
            issuer: SessionIssuer::new(config.auth.jwt_secret.as_bytes()),
            config,
        }
    }
}

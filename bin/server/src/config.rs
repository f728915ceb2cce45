//! Centralized server configuration.
//!
//! Strongly-typed configuration loaded via the `config` crate from
//! environment variables (`__` as the nesting separator, e.g.
//! `BOT__TOKEN`). Required values missing at startup fail loudly before
//! the server binds.

use serde::Deserialize;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// HTTP listener configuration.
    #[serde(default)]
    pub http: HttpConfig,

    /// Telegram bot configuration.
    pub bot: BotConfig,

    /// Session token configuration.
    pub auth: AuthConfig,

    /// Subscription-cache reconciler configuration.
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Address to bind the API server on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

/// Telegram bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// The bot token issued by BotFather.
    pub token: String,

    /// The channel whose membership gates access. A bare username, an
    /// `@username`, or a numeric chat id.
    pub channel_id: String,

    /// The bot's username, without the `@`. Used in deep links.
    pub username: String,
}

impl BotConfig {
    /// A public URL for the gating channel, when one can be derived.
    ///
    /// Numeric channel ids have no public URL; the subscribe button is
    /// omitted for those.
    #[must_use]
    pub fn channel_url(&self) -> Option<String> {
        let name = self.channel_id.strip_prefix('@').unwrap_or(&self.channel_id);
        if name.is_empty() || name.starts_with('-') || name.chars().all(|c| c.is_ascii_digit()) {
            None
        } else {
            Some(format!("https://t.me/{name}"))
        }
    }
}

/// Session token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret for access and refresh tokens.
    pub jwt_secret: String,
}

/// Reconciler configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconcilerConfig {
    /// Seconds between reconciliation runs.
    #[serde(default = "default_reconcile_interval_seconds")]
    pub interval_seconds: u64,

    /// Maximum expired rows processed per run.
    #[serde(default = "default_reconcile_batch_size")]
    pub batch_size: i64,
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_reconcile_interval_seconds() -> u64 {
    3600
}

fn default_reconcile_batch_size() -> i64 {
    100
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_reconcile_interval_seconds(),
            batch_size: default_reconcile_batch_size(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconciler_config_has_correct_defaults() {
        let config = ReconcilerConfig::default();
        assert_eq!(config.interval_seconds, 3600);
        assert_eq!(config.batch_size, 100);
    }

    #[test]
    fn http_config_defaults_to_localhost() {
        let config = HttpConfig::default();
        assert_eq!(config.listen_addr, "127.0.0.1:3000");
    }

    fn bot_config(channel_id: &str) -> BotConfig {
        BotConfig {
            token: "123456:TEST".to_string(),
            channel_id: channel_id.to_string(),
            username: "habbiter_bot".to_string(),
        }
    }

    #[test]
    fn channel_url_derives_from_username() {
        assert_eq!(
            bot_config("habbiter_channel").channel_url().as_deref(),
            Some("https://t.me/habbiter_channel")
        );
        assert_eq!(
            bot_config("@habbiter_channel").channel_url().as_deref(),
            Some("https://t.me/habbiter_channel")
        );
    }

    #[test]
    fn numeric_channel_has_no_public_url() {
        assert!(bot_config("-1001234567890").channel_url().is_none());
        assert!(bot_config("1234567890").channel_url().is_none());
    }
}

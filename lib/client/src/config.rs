//! Client configuration.
//!
//! The host application supplies these values at startup. Validation runs
//! before the first network call so a misconfigured build fails with a
//! nameable error instead of an opaque request failure.

use crate::error::ClientError;

/// Configuration for the auth client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the auth server.
    pub server_url: String,
    /// Public API key sent with every request.
    pub api_key: String,
    /// Username of the bot, without the `@`.
    pub bot_username: String,
}

impl ClientConfig {
    /// Creates a configuration from the host's settings.
    #[must_use]
    pub fn new(
        server_url: impl Into<String>,
        api_key: impl Into<String>,
        bot_username: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            api_key: api_key.into(),
            bot_username: bot_username.into(),
        }
    }

    /// Checks that every required option is present.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.server_url.trim().is_empty() {
            return Err(ClientError::Configuration {
                reason: "server URL is not set".to_string(),
            });
        }
        if self.api_key.trim().is_empty() {
            return Err(ClientError::Configuration {
                reason: "API key is not set".to_string(),
            });
        }
        if self.bot_username.trim().is_empty() {
            return Err(ClientError::Configuration {
                reason: "bot username is not set".to_string(),
            });
        }
        Ok(())
    }

    /// The deep link that opens the bot chat with a pairing token attached.
    ///
    /// Tolerates a configured username with a leading `@`.
    #[must_use]
    pub fn bot_deep_link(&self, token: &str) -> String {
        format!(
            "https://t.me/{}?start=auth_{token}",
            self.bot_username.trim_start_matches('@')
        )
    }
}

//! Login signature verification.
//!
//! Telegram derives the signing key from the bot token in two different
//! ways depending on where the login happened. Verification is otherwise
//! identical: HMAC-SHA256 over the canonical data-check string, compared
//! against the `hash` field in constant time.

use crate::assertion::{InitData, TelegramAccount, WidgetAssertion};
use crate::error::AuthenticationError;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted age of a widget login, in seconds.
///
/// Widget payloads are replayable until they age out, so the window is
/// kept short. Init data is not aged here: the embedded app hands it over
/// immediately and re-requests it on every launch.
pub const WIDGET_LOGIN_MAX_AGE_SECS: i64 = 3600;

/// The two ways Telegram signs login data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningScheme {
    /// Login Widget: the secret key is SHA-256 of the bot token.
    Widget,
    /// Embedded app init data: the secret key is HMAC-SHA256 of the bot
    /// token keyed with the literal string "WebAppData".
    WebApp,
}

impl SigningScheme {
    /// Derives the signing key for this scheme from the bot token.
    #[must_use]
    pub fn secret_key(self, bot_token: &str) -> Vec<u8> {
        match self {
            Self::Widget => Sha256::digest(bot_token.as_bytes()).to_vec(),
            Self::WebApp => {
                // HMAC accepts keys of any length, so this cannot fail.
                let Ok(mut mac) = HmacSha256::new_from_slice(b"WebAppData") else {
                    return Vec::new();
                };
                mac.update(bot_token.as_bytes());
                mac.finalize().into_bytes().to_vec()
            }
        }
    }
}

fn hash_matches(secret: &[u8], message: &str, provided_hex: &str) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(message.as_bytes());
    let calculated = hex::encode(mac.finalize().into_bytes());
    subtle::ConstantTimeEq::ct_eq(calculated.as_bytes(), provided_hex.as_bytes()).into()
}

/// Verifies signed login payloads against the bot token.
///
/// Both signing keys are derived once at construction.
#[derive(Clone)]
pub struct CredentialVerifier {
    widget_secret: Vec<u8>,
    webapp_secret: Vec<u8>,
}

impl CredentialVerifier {
    /// Creates a verifier for the given bot token.
    #[must_use]
    pub fn new(bot_token: &str) -> Self {
        Self {
            widget_secret: SigningScheme::Widget.secret_key(bot_token),
            webapp_secret: SigningScheme::WebApp.secret_key(bot_token),
        }
    }

    /// Verifies a Login Widget payload.
    ///
    /// The signature is checked before anything is read out of the
    /// payload; a stale `auth_date` is rejected even when the signature
    /// is valid.
    pub fn verify_widget(
        &self,
        assertion: &WidgetAssertion,
    ) -> Result<TelegramAccount, AuthenticationError> {
        if !hash_matches(
            &self.widget_secret,
            &assertion.data_check_string(),
            assertion.hash(),
        ) {
            return Err(AuthenticationError::InvalidSignature);
        }

        let age_secs = Utc::now().timestamp() - assertion.auth_date()?;
        if age_secs > WIDGET_LOGIN_MAX_AGE_SECS {
            return Err(AuthenticationError::StaleLogin { age_secs });
        }

        assertion.account()
    }

    /// Verifies embedded-app init data.
    pub fn verify_init_data(
        &self,
        init_data: &InitData,
    ) -> Result<TelegramAccount, AuthenticationError> {
        if !hash_matches(
            &self.webapp_secret,
            &init_data.data_check_string(),
            init_data.hash(),
        ) {
            return Err(AuthenticationError::InvalidSignature);
        }

        init_data.account()
    }
}

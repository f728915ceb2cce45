//! Deep-link pairing tokens.
//!
//! When the embedded login path is unavailable, the client generates a
//! pairing token, sends the user to the bot with `?start=auth_<token>`, and
//! polls until the bot claims the token. A token is claimed exactly once,
//! and only after the bot has confirmed the channel subscription.

use chrono::{DateTime, Duration, Utc};
use habbiter_core::TelegramId;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// How long a pending pairing token stays claimable.
pub const PAIRING_TOKEN_TTL_SECS: i64 = 600;

/// The `/start` payload prefix that carries a pairing token.
pub const START_COMMAND_PREFIX: &str = "/start auth_";

/// Lifecycle state of a pairing token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    /// Waiting for the bot side to confirm.
    Pending,
    /// Claimed by a subscribed account.
    Success,
}

/// What a poll of a pairing token resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Keep polling.
    Pending,
    /// The token aged out before being claimed. Stop polling.
    Expired,
    /// Claimed; a session can be issued for this account.
    Success { telegram_id: TelegramId },
}

/// A pairing token row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingToken {
    /// Opaque token value; also the `start` payload.
    token: String,
    /// Set when the bot learns which account is pairing. Present before
    /// success if the user arrived unsubscribed and was asked to subscribe.
    telegram_id: Option<TelegramId>,
    status: TokenStatus,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    claimed_at: Option<DateTime<Utc>>,
}

impl PairingToken {
    /// Generates a fresh pending token.
    #[must_use]
    pub fn generate() -> Self {
        let now = Utc::now();
        Self {
            token: Ulid::new().to_string(),
            telegram_id: None,
            status: TokenStatus::Pending,
            created_at: now,
            expires_at: now + Duration::seconds(PAIRING_TOKEN_TTL_SECS),
            claimed_at: None,
        }
    }

    /// Creates a token with all fields specified.
    ///
    /// Use this when reconstituting a token from storage.
    #[must_use]
    pub fn with_all_fields(
        token: String,
        telegram_id: Option<TelegramId>,
        status: TokenStatus,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        claimed_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            token,
            telegram_id,
            status,
            created_at,
            expires_at,
            claimed_at,
        }
    }

    /// Returns the opaque token value.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the paired Telegram account, if known yet.
    #[must_use]
    pub fn telegram_id(&self) -> Option<TelegramId> {
        self.telegram_id
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn status(&self) -> TokenStatus {
        self.status
    }

    /// Returns when the token was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when a pending token stops being claimable.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns when the token was claimed, if it was.
    #[must_use]
    pub fn claimed_at(&self) -> Option<DateTime<Utc>> {
        self.claimed_at
    }

    /// Whether the bot may still claim this token at `now`.
    #[must_use]
    pub fn can_claim_at(&self, now: DateTime<Utc>) -> bool {
        self.status == TokenStatus::Pending && now < self.expires_at
    }

    /// Remembers which account is attempting to pair, without claiming.
    ///
    /// Used when the user arrives unsubscribed: the account is recorded so
    /// a later "I subscribed" press can find this token again.
    pub fn attach_telegram_id(&mut self, telegram_id: TelegramId) {
        self.telegram_id = Some(telegram_id);
    }

    /// Claims the token for a subscribed account.
    pub fn claim(&mut self, telegram_id: TelegramId) {
        self.telegram_id = Some(telegram_id);
        self.status = TokenStatus::Success;
        self.claimed_at = Some(Utc::now());
    }

    /// Resolves what a poll at `now` should report.
    pub fn poll_outcome_at(&self, now: DateTime<Utc>) -> PollOutcome {
        match (self.status, self.telegram_id) {
            (TokenStatus::Success, Some(telegram_id)) => PollOutcome::Success { telegram_id },
            // A success row without an account cannot complete a login.
            (TokenStatus::Success, None) => PollOutcome::Pending,
            (TokenStatus::Pending, _) if now >= self.expires_at => PollOutcome::Expired,
            (TokenStatus::Pending, _) => PollOutcome::Pending,
        }
    }
}

/// Extracts the pairing token from a `/start` command, if it carries one.
#[must_use]
pub fn token_from_start_command(text: &str) -> Option<&str> {
    text.strip_prefix(START_COMMAND_PREFIX)
        .filter(|token| !token.is_empty())
}

//! User profile domain type.
//!
//! A profile is the ledger row behind a Telegram account: identity fields
//! copied from the latest verified login, plus the cached subscription
//! state. Profiles are keyed by `telegram_id`; the internal `id` exists for
//! session subjects and audit records.

use crate::assertion::TelegramAccount;
use crate::session::{AppMetadata, SessionUser};
use chrono::{DateTime, Duration, Utc};
use habbiter_core::{TelegramId, UserId};
use serde::{Deserialize, Serialize};

/// How long a successful subscription check stays trusted.
pub const SUBSCRIPTION_CACHE_TTL_DAYS: i64 = 7;

/// A user's ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Internal platform user ID.
    id: UserId,
    /// The Telegram account this profile belongs to.
    telegram_id: TelegramId,
    /// Telegram username, without the `@`.
    username: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    photo_url: Option<String>,
    /// Result of the most recent subscription check.
    is_subscribed: bool,
    /// When the subscription was last checked.
    subscription_checked_at: Option<DateTime<Utc>>,
    /// When the cached subscription state stops being trusted.
    subscription_expires_at: Option<DateTime<Utc>>,
    /// When the profile was created.
    created_at: DateTime<Utc>,
    /// When the profile was last updated.
    updated_at: DateTime<Utc>,
}

impl Profile {
    /// Creates a profile for a first-time login.
    ///
    /// The subscription state starts out unchecked, so the first gate pass
    /// always consults the oracle.
    #[must_use]
    pub fn from_account(account: &TelegramAccount) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            telegram_id: account.id,
            username: account.username.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            photo_url: account.photo_url.clone(),
            is_subscribed: false,
            subscription_checked_at: None,
            subscription_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a profile with all fields specified.
    ///
    /// Use this when reconstituting a profile from storage.
    #[must_use]
    #[expect(clippy::too_many_arguments)]
    pub fn with_all_fields(
        id: UserId,
        telegram_id: TelegramId,
        username: Option<String>,
        first_name: Option<String>,
        last_name: Option<String>,
        photo_url: Option<String>,
        is_subscribed: bool,
        subscription_checked_at: Option<DateTime<Utc>>,
        subscription_expires_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            telegram_id,
            username,
            first_name,
            last_name,
            photo_url,
            is_subscribed,
            subscription_checked_at,
            subscription_expires_at,
            created_at,
            updated_at,
        }
    }

    /// Returns the internal platform ID.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Returns the Telegram account ID.
    #[must_use]
    pub fn telegram_id(&self) -> TelegramId {
        self.telegram_id
    }

    /// Returns the Telegram username, if set.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Returns the first name, if known.
    #[must_use]
    pub fn first_name(&self) -> Option<&str> {
        self.first_name.as_deref()
    }

    /// Returns the last name, if known.
    #[must_use]
    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    /// Returns the profile photo URL, if known.
    #[must_use]
    pub fn photo_url(&self) -> Option<&str> {
        self.photo_url.as_deref()
    }

    /// Returns the cached subscription state.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.is_subscribed
    }

    /// Returns when the subscription was last checked.
    #[must_use]
    pub fn subscription_checked_at(&self) -> Option<DateTime<Utc>> {
        self.subscription_checked_at
    }

    /// Returns when the cached subscription state expires.
    #[must_use]
    pub fn subscription_expires_at(&self) -> Option<DateTime<Utc>> {
        self.subscription_expires_at
    }

    /// Returns when the profile was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the profile was last updated.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Copies identity fields from a freshly verified login.
    pub fn apply_account(&mut self, account: &TelegramAccount) {
        self.username = account.username.clone();
        self.first_name = account.first_name.clone();
        self.last_name = account.last_name.clone();
        self.photo_url = account.photo_url.clone();
        self.updated_at = Utc::now();
    }

    /// Records the outcome of a successful subscription check.
    ///
    /// Every successful check refreshes the cache window, whichever way the
    /// answer went. Failed checks must not call this: the previous state
    /// stays in place until a check actually completes.
    pub fn record_subscription_check(&mut self, is_subscribed: bool) {
        let now = Utc::now();
        self.is_subscribed = is_subscribed;
        self.subscription_checked_at = Some(now);
        self.subscription_expires_at = Some(now + Duration::days(SUBSCRIPTION_CACHE_TTL_DAYS));
        self.updated_at = now;
    }

    /// Whether the cached subscription state is still inside its window.
    #[must_use]
    pub fn subscription_cache_fresh(&self, now: DateTime<Utc>) -> bool {
        self.subscription_expires_at.is_some_and(|t| t > now)
    }

    /// The session view of this profile.
    #[must_use]
    pub fn session_user(&self) -> SessionUser {
        SessionUser {
            id: self.id,
            telegram_id: self.telegram_id,
            app_metadata: AppMetadata {
                is_subscribed: self.is_subscribed,
            },
        }
    }
}

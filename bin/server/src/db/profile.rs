//! User ledger repository.

use chrono::{DateTime, Utc};
use habbiter_core::{TelegramId, UserId};
use habbiter_platform_access::Profile;
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

/// Row type for user queries.
#[derive(FromRow)]
struct ProfileRow {
    id: String,
    telegram_id: i64,
    username: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    photo_url: Option<String>,
    is_subscribed: bool,
    subscription_checked_at: Option<DateTime<Utc>>,
    subscription_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProfileRow {
    fn try_into_profile(self) -> Result<Profile, sqlx::Error> {
        let id = UserId::from_str(&self.id).map_err(|e| {
            sqlx::Error::Decode(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid user id '{}': {}", self.id, e),
            )))
        })?;
        Ok(Profile::with_all_fields(
            id,
            TelegramId::new(self.telegram_id),
            self.username,
            self.first_name,
            self.last_name,
            self.photo_url,
            self.is_subscribed,
            self.subscription_checked_at,
            self.subscription_expires_at,
            self.created_at,
            self.updated_at,
        ))
    }
}

const PROFILE_COLUMNS: &str = "id, telegram_id, username, first_name, last_name, photo_url, \
     is_subscribed, subscription_checked_at, subscription_expires_at, created_at, updated_at";

/// Repository for the `users` ledger.
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    /// Creates a new profile repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Finds a profile by its Telegram account id.
    pub async fn find_by_telegram_id(
        &self,
        telegram_id: TelegramId,
    ) -> Result<Option<Profile>, sqlx::Error> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {PROFILE_COLUMNS} FROM users WHERE telegram_id = $1"
        ))
        .bind(telegram_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(r.try_into_profile()?)),
            None => Ok(None),
        }
    }

    /// Finds a profile by its internal id.
    pub async fn find_by_id(&self, id: UserId) -> Result<Option<Profile>, sqlx::Error> {
        let row: Option<ProfileRow> =
            sqlx::query_as(&format!("SELECT {PROFILE_COLUMNS} FROM users WHERE id = $1"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(r) => Ok(Some(r.try_into_profile()?)),
            None => Ok(None),
        }
    }

    /// Upserts a profile on a successful login, keyed on `telegram_id`.
    ///
    /// A concurrent insert for the same account resolves to an update; the
    /// existing internal id and creation time win. `last_login_at` is
    /// maintained here and only here. Returns the stored row.
    pub async fn upsert_login(&self, profile: &Profile) -> Result<Profile, sqlx::Error> {
        let row: ProfileRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO users
                (id, telegram_id, username, first_name, last_name, photo_url,
                 is_subscribed, subscription_checked_at, subscription_expires_at,
                 created_at, updated_at, last_login_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW())
            ON CONFLICT (telegram_id) DO UPDATE SET
                username = EXCLUDED.username,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                photo_url = EXCLUDED.photo_url,
                is_subscribed = EXCLUDED.is_subscribed,
                subscription_checked_at = EXCLUDED.subscription_checked_at,
                subscription_expires_at = EXCLUDED.subscription_expires_at,
                updated_at = EXCLUDED.updated_at,
                last_login_at = NOW()
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(profile.id().to_string())
        .bind(profile.telegram_id().as_i64())
        .bind(profile.username())
        .bind(profile.first_name())
        .bind(profile.last_name())
        .bind(profile.photo_url())
        .bind(profile.is_subscribed())
        .bind(profile.subscription_checked_at())
        .bind(profile.subscription_expires_at())
        .bind(profile.created_at())
        .bind(profile.updated_at())
        .fetch_one(&self.pool)
        .await?;

        row.try_into_profile()
    }

    /// Writes back refreshed subscription fields without touching
    /// `last_login_at`. Used by the checks and the reconciler.
    pub async fn update_subscription(&self, profile: &Profile) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET is_subscribed = $2,
                subscription_checked_at = $3,
                subscription_expires_at = $4,
                updated_at = $5
            WHERE telegram_id = $1
            "#,
        )
        .bind(profile.telegram_id().as_i64())
        .bind(profile.is_subscribed())
        .bind(profile.subscription_checked_at())
        .bind(profile.subscription_expires_at())
        .bind(profile.updated_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Profiles whose subscription cache has lapsed, oldest first.
    pub async fn find_expired(&self, limit: i64) -> Result<Vec<Profile>, sqlx::Error> {
        let rows: Vec<ProfileRow> = sqlx::query_as(&format!(
            r#"
            SELECT {PROFILE_COLUMNS}
            FROM users
            WHERE subscription_expires_at IS NOT NULL
              AND subscription_expires_at < NOW()
            ORDER BY subscription_expires_at
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ProfileRow::try_into_profile).collect()
    }
}

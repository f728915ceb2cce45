//! Pairing token repository.
//!
//! After creation a token row is written by exactly one actor (the webhook)
//! and read by exactly one actor (the polling client), so claims need no
//! transactional locking: the claim statement's own predicate is enough.

use chrono::{DateTime, Utc};
use habbiter_core::TelegramId;
use habbiter_platform_access::{PairingToken, TokenStatus};
use sqlx::{FromRow, PgPool};

/// Row type for pairing token queries.
#[derive(FromRow)]
struct PairingRow {
    token: String,
    telegram_id: Option<i64>,
    status: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    claimed_at: Option<DateTime<Utc>>,
}

impl PairingRow {
    fn try_into_token(self) -> Result<PairingToken, sqlx::Error> {
        let status = match self.status.as_str() {
            "pending" => TokenStatus::Pending,
            "success" => TokenStatus::Success,
            other => {
                return Err(sqlx::Error::Decode(Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("invalid token status '{other}'"),
                ))));
            }
        };
        Ok(PairingToken::with_all_fields(
            self.token,
            self.telegram_id.map(TelegramId::new),
            status,
            self.created_at,
            self.expires_at,
            self.claimed_at,
        ))
    }
}

const TOKEN_COLUMNS: &str =
    "token, telegram_id, status, created_at, expires_at, claimed_at";

fn status_str(status: TokenStatus) -> &'static str {
    match status {
        TokenStatus::Pending => "pending",
        TokenStatus::Success => "success",
    }
}

/// Repository for the `auth_tokens` table.
pub struct PairingRepository {
    pool: PgPool,
}

impl PairingRepository {
    /// Creates a new pairing repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a freshly generated token.
    pub async fn create(&self, token: &PairingToken) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO auth_tokens (token, telegram_id, status, created_at, expires_at, claimed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(token.token())
        .bind(token.telegram_id().map(|id| id.as_i64()))
        .bind(status_str(token.status()))
        .bind(token.created_at())
        .bind(token.expires_at())
        .bind(token.claimed_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Finds a token by its value.
    pub async fn find(&self, token: &str) -> Result<Option<PairingToken>, sqlx::Error> {
        let row: Option<PairingRow> = sqlx::query_as(&format!(
            "SELECT {TOKEN_COLUMNS} FROM auth_tokens WHERE token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(r.try_into_token()?)),
            None => Ok(None),
        }
    }

    /// Remembers which account is attempting to pair on a still-pending
    /// token, so a later "I subscribed" press can find it again.
    pub async fn attach_telegram_id(
        &self,
        token: &str,
        telegram_id: TelegramId,
        username: Option<&str>,
        first_name: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE auth_tokens
            SET telegram_id = $2, telegram_username = $3, telegram_first_name = $4
            WHERE token = $1 AND status = 'pending' AND expires_at > NOW()
            "#,
        )
        .bind(token)
        .bind(telegram_id.as_i64())
        .bind(username)
        .bind(first_name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Claims a token for a subscribed account.
    ///
    /// Succeeds for pending tokens inside their window, and re-succeeds for
    /// already-claimed ones (webhook deliveries retry; the re-claim just
    /// re-writes the same fields). Expired or unknown tokens return `None`.
    pub async fn claim(
        &self,
        token: &str,
        telegram_id: TelegramId,
        username: Option<&str>,
        first_name: Option<&str>,
    ) -> Result<Option<PairingToken>, sqlx::Error> {
        let row: Option<PairingRow> = sqlx::query_as(&format!(
            r#"
            UPDATE auth_tokens
            SET status = 'success',
                telegram_id = $2,
                telegram_username = $3,
                telegram_first_name = $4,
                claimed_at = NOW()
            WHERE token = $1
              AND (status = 'success' OR (status = 'pending' AND expires_at > NOW()))
            RETURNING {TOKEN_COLUMNS}
            "#
        ))
        .bind(token)
        .bind(telegram_id.as_i64())
        .bind(username)
        .bind(first_name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(r.try_into_token()?)),
            None => Ok(None),
        }
    }

    /// The most recent claimable token attached to an account.
    ///
    /// Backs the plain `/start` resume: the user opened the deep link
    /// earlier, was asked to subscribe, and came back without the link.
    pub async fn latest_pending_for(
        &self,
        telegram_id: TelegramId,
    ) -> Result<Option<PairingToken>, sqlx::Error> {
        let row: Option<PairingRow> = sqlx::query_as(&format!(
            r#"
            SELECT {TOKEN_COLUMNS}
            FROM auth_tokens
            WHERE telegram_id = $1 AND status = 'pending' AND expires_at > NOW()
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(telegram_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(r.try_into_token()?)),
            None => Ok(None),
        }
    }
}

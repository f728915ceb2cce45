//! Append-only audit tables.
//!
//! `subscription_checks` records every authoritative membership check;
//! `cron_execution_logs` records one row per reconciler run. Neither table
//! is ever updated or deleted.

use habbiter_core::{CronRunId, SubscriptionCheckId, UserId};
use sqlx::PgPool;

/// How a subscription check was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMethod {
    /// The user pressed the in-app "I subscribed" button.
    Manual,
    /// The periodic reconciler.
    Cron,
    /// The bot-chat "I subscribed" callback button.
    WebhookButton,
}

impl CheckMethod {
    /// The string stored in the audit row.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Cron => "cron",
            Self::WebhookButton => "webhook_button",
        }
    }
}

/// Repository for the `subscription_checks` audit log.
pub struct SubscriptionCheckRepository {
    pool: PgPool,
}

impl SubscriptionCheckRepository {
    /// Creates a new check-log repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends one check record.
    pub async fn record(
        &self,
        user_id: UserId,
        is_subscribed: bool,
        method: CheckMethod,
    ) -> Result<(), sqlx::Error> {
        let status = if is_subscribed { "member" } else { "left" };
        sqlx::query(
            r#"
            INSERT INTO subscription_checks (id, user_id, is_subscribed, check_method, status, checked_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            "#,
        )
        .bind(SubscriptionCheckId::new().to_string())
        .bind(user_id.to_string())
        .bind(is_subscribed)
        .bind(method.as_str())
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Repository for the `cron_execution_logs` table.
pub struct CronLogRepository {
    pool: PgPool,
}

impl CronLogRepository {
    /// Creates a new cron-log repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends one run record.
    pub async fn record(
        &self,
        job_name: &str,
        status: &str,
        result: &serde_json::Value,
        error_message: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO cron_execution_logs (id, job_name, status, result, error_message, executed_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            "#,
        )
        .bind(CronRunId::new().to_string())
        .bind(job_name)
        .bind(status)
        .bind(result)
        .bind(error_message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

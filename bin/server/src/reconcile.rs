//! Subscription cache reconciliation.
//!
//! Profiles whose 7-day cache window has lapsed are re-checked against the
//! oracle in bounded batches. Rows whose re-check fails are skipped and
//! stay due for the next run, so a Bot API outage can never mass-flip
//! members or spam lapse notifications. A notification fires only on a
//! true → false transition, never on stable states.

use crate::db::{CheckMethod, CronLogRepository, ProfileRepository, SubscriptionCheckRepository};
use crate::state::AppState;
use habbiter_telegram::{BotApiError, InlineKeyboardButton, InlineKeyboardMarkup};
use serde_json::json;
use std::sync::Arc;

/// Job name recorded in `cron_execution_logs`.
const JOB_NAME: &str = "check-subscriptions";

/// Outcome of one reconciliation run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Rows whose re-check completed and was written back.
    pub processed: usize,
    /// Rows skipped because the re-check or write-back failed.
    pub errors: usize,
    /// Rows that flipped subscribed → unsubscribed.
    pub lapsed: usize,
}

/// Per-row decision after a re-check attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowAction {
    /// Write the result back; `lapsed` means subscribed flipped to
    /// unsubscribed and the member gets exactly one notice.
    Apply { is_member: bool, lapsed: bool },
    /// Undetermined: skip the row so it stays due for the next run.
    Skip,
}

fn row_action(was_subscribed: bool, check: &Result<bool, BotApiError>) -> RowAction {
    match *check {
        Ok(is_member) => RowAction::Apply {
            is_member,
            lapsed: was_subscribed && !is_member,
        },
        Err(_) => RowAction::Skip,
    }
}

/// Runs one reconciliation pass over expired cache rows.
pub async fn run_once(state: &AppState) -> Result<ReconcileStats, sqlx::Error> {
    let profiles = ProfileRepository::new(state.db_pool.clone());
    let checks = SubscriptionCheckRepository::new(state.db_pool.clone());

    let expired = profiles
        .find_expired(state.config.reconciler.batch_size)
        .await?;
    let batch = expired.len();

    let mut stats = ReconcileStats::default();
    for profile in expired {
        let telegram_id = profile.telegram_id();

        let check = state
            .bot
            .is_channel_member(&state.config.bot.channel_id, telegram_id)
            .await;
        let RowAction::Apply { is_member, lapsed } = row_action(profile.is_subscribed(), &check)
        else {
            // Undetermined; leave the row due for the next run.
            if let Err(e) = &check {
                tracing::warn!(%telegram_id, error = %e, "reconcile re-check failed");
            }
            stats.errors += 1;
            continue;
        };

        let mut updated = profile;
        updated.record_subscription_check(is_member);
        if let Err(e) = profiles.update_subscription(&updated).await {
            tracing::warn!(%telegram_id, error = %e, "reconcile write-back failed");
            stats.errors += 1;
            continue;
        }

        if let Err(e) = checks
            .record(updated.id(), is_member, CheckMethod::Cron)
            .await
        {
            tracing::warn!(%telegram_id, error = %e, "reconcile check-log append failed");
        }

        if lapsed {
            stats.lapsed += 1;
            notify_lapsed(state, telegram_id).await;
        }
        stats.processed += 1;
    }

    tracing::info!(
        batch,
        processed = stats.processed,
        errors = stats.errors,
        lapsed = stats.lapsed,
        "reconciliation run complete"
    );

    let status = if stats.errors == 0 {
        "success"
    } else {
        "partial_success"
    };
    CronLogRepository::new(state.db_pool.clone())
        .record(
            JOB_NAME,
            status,
            &json!({
                "processed": stats.processed,
                "errors": stats.errors,
                "lapsed": stats.lapsed,
            }),
            None,
        )
        .await?;

    Ok(stats)
}

/// Tells a lapsed subscriber their access will stop working.
async fn notify_lapsed(state: &AppState, telegram_id: habbiter_core::TelegramId) {
    let mut buttons = Vec::new();
    if let Some(url) = state.config.bot.channel_url() {
        buttons.push(InlineKeyboardButton::url("Subscribe to the channel", url));
    }
    buttons.push(InlineKeyboardButton::callback(
        "I subscribed",
        "check_subscription",
    ));

    let text = "You've left our channel, so your habbiter access will stop working. \
                Subscribe again to keep using the app.";
    if let Err(e) = state
        .bot
        .send_message(telegram_id, text, Some(InlineKeyboardMarkup::rows(buttons)))
        .await
    {
        tracing::warn!(%telegram_id, error = %e, "failed to send lapse notification");
    }
}

/// Spawns the periodic reconciliation task.
pub fn spawn_periodic(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    let interval_secs = state.config.reconciler.interval_seconds;
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        // The immediate first tick is skipped; startup already ran a pass.
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = run_once(&state).await {
                tracing::warn!(error = %e, "periodic reconciliation failed");
            }
        }
    })
}

//! Subscription check endpoints.

use crate::db::{CheckMethod, ProfileRepository, SubscriptionCheckRepository};
use crate::error::ApiError;
use crate::extract::RequireSession;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use chrono::Utc;
use habbiter_platform_access::{AuthenticationError, CheckOutcome, SubscriptionStatus};
use std::sync::Arc;

/// `POST /check-subscription` — the authoritative live check.
///
/// An oracle failure returns the distinct `network_error` shape (500),
/// never a definitive false, and leaves the cached ledger state untouched.
pub async fn check_subscription(
    State(state): State<Arc<AppState>>,
    session: RequireSession,
) -> Result<Json<CheckOutcome>, ApiError> {
    let telegram_id = session.telegram_id();

    // The oracle is consulted before anything is written; a transport
    // failure must not disturb the cache.
    let is_member = state
        .bot
        .is_channel_member(&state.config.bot.channel_id, telegram_id)
        .await?;

    let repo = ProfileRepository::new(state.db_pool.clone());
    let mut profile = repo.find_by_telegram_id(telegram_id).await?.ok_or_else(|| {
        ApiError::Authentication(AuthenticationError::InvalidToken {
            reason: "unknown session subject".to_string(),
        })
    })?;

    profile.record_subscription_check(is_member);
    repo.update_subscription(&profile).await?;

    SubscriptionCheckRepository::new(state.db_pool.clone())
        .record(profile.id(), is_member, CheckMethod::Manual)
        .await?;

    tracing::info!(%telegram_id, is_member, "manual subscription check");
    Ok(Json(CheckOutcome {
        is_subscribed: is_member,
        checked_at: profile.subscription_checked_at().unwrap_or_else(Utc::now),
    }))
}

/// `GET /subscription-status` — the cached ledger read backing the guard's
/// middle tier. No oracle call; `needsCheck` tells the client whether the
/// answer is still inside its trust window.
pub async fn subscription_status(
    State(state): State<Arc<AppState>>,
    session: RequireSession,
) -> Result<Json<SubscriptionStatus>, ApiError> {
    let profile = ProfileRepository::new(state.db_pool.clone())
        .find_by_telegram_id(session.telegram_id())
        .await?
        .ok_or_else(|| {
            ApiError::Authentication(AuthenticationError::InvalidToken {
                reason: "unknown session subject".to_string(),
            })
        })?;

    Ok(Json(SubscriptionStatus {
        is_subscribed: profile.is_subscribed(),
        needs_check: !profile.subscription_cache_fresh(Utc::now()),
    }))
}

//! Login endpoints.
//!
//! Both login paths issue a session whenever the signature verifies,
//! subscribed or not: a plain browser or embedded app has no channel to
//! negotiate a subscription in, so gating is the client guard's job. Only
//! the bot-chat deep-link path (see `routes::webhook`) withholds its token
//! until membership is confirmed.

use crate::db::ProfileRepository;
use crate::error::ApiError;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use habbiter_platform_access::{
    AuthResponse, InitData, InitDataRequest, Profile, RefreshRequest, Session, TelegramAccount,
    WidgetAssertion,
};
use std::sync::Arc;

/// `POST /telegram-auth` — Login Widget payload.
pub async fn telegram_auth(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<AuthResponse>, ApiError> {
    let assertion = WidgetAssertion::from_json(&payload)?;
    let account = state.verifier.verify_widget(&assertion)?;
    tracing::info!(telegram_id = %account.id, "widget login verified");

    let profile = provision(&state, &account).await?;
    let session = state.issuer.issue(&profile.session_user())?;
    Ok(Json(AuthResponse {
        is_subscribed: profile.is_subscribed(),
        session,
    }))
}

/// `POST /telegram-auth-miniapp` — embedded-app init data.
pub async fn telegram_auth_miniapp(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InitDataRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let init_data = InitData::parse(&request.init_data)?;
    let account = state.verifier.verify_init_data(&init_data)?;
    tracing::info!(telegram_id = %account.id, "embedded-app login verified");

    let profile = provision(&state, &account).await?;
    let session = state.issuer.issue(&profile.session_user())?;
    Ok(Json(AuthResponse {
        is_subscribed: profile.is_subscribed(),
        session,
    }))
}

/// `POST /refresh-session` — exchange a refresh token for a fresh pair.
///
/// The new access token carries the ledger's current subscription state,
/// not the one frozen into the old pair.
pub async fn refresh_session(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<Session>, ApiError> {
    use habbiter_platform_access::AuthenticationError;
    use std::str::FromStr;

    let claims = state.issuer.verify_refresh(&request.refresh_token)?;
    let user_id = habbiter_core::UserId::from_str(&claims.sub).map_err(|e| {
        ApiError::Authentication(AuthenticationError::InvalidToken {
            reason: e.to_string(),
        })
    })?;

    let repo = ProfileRepository::new(state.db_pool.clone());
    let profile = repo.find_by_id(user_id).await?.ok_or_else(|| {
        ApiError::Authentication(AuthenticationError::InvalidToken {
            reason: "unknown session subject".to_string(),
        })
    })?;

    let session = state.issuer.issue(&profile.session_user())?;
    Ok(Json(session))
}

/// Provisions the ledger row for a verified login.
///
/// Runs the subscription check and upserts the profile. When the oracle
/// gives no answer, the cached subscription fields are carried over
/// untouched rather than poisoned with a coerced false; the client guard
/// re-checks on its own schedule.
pub(crate) async fn provision(
    state: &AppState,
    account: &TelegramAccount,
) -> Result<Profile, ApiError> {
    let repo = ProfileRepository::new(state.db_pool.clone());

    let mut profile = match repo.find_by_telegram_id(account.id).await? {
        Some(mut existing) => {
            existing.apply_account(account);
            existing
        }
        None => Profile::from_account(account),
    };

    match state
        .bot
        .is_channel_member(&state.config.bot.channel_id, account.id)
        .await
    {
        Ok(is_member) => profile.record_subscription_check(is_member),
        Err(e) => {
            tracing::warn!(
                telegram_id = %account.id,
                error = %e,
                "subscription check failed during login; keeping cached state"
            );
        }
    }

    Ok(repo.upsert_login(&profile).await?)
}

//! Pairing token endpoint.

use crate::db::{PairingRepository, ProfileRepository};
use crate::error::ApiError;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use habbiter_platform_access::{PairingToken, PollOutcome, PollResponse, TokenAction, TokenGrant};
use std::sync::Arc;

/// `POST /generate-auth-token` — generate and poll actions share one
/// endpoint, discriminated by the `action` field.
pub async fn token_action(
    State(state): State<Arc<AppState>>,
    Json(action): Json<TokenAction>,
) -> Result<Response, ApiError> {
    match action {
        TokenAction::Generate => {
            let token = PairingToken::generate();
            PairingRepository::new(state.db_pool.clone())
                .create(&token)
                .await?;
            tracing::debug!(token = token.token(), "pairing token generated");
            Ok(Json(TokenGrant {
                token: token.token().to_string(),
            })
            .into_response())
        }
        TokenAction::Poll { token } => {
            let response = poll(&state, &token).await?;
            Ok(Json(response).into_response())
        }
    }
}

/// Resolves one poll. Unknown tokens report `pending`, never an error: the
/// webhook may simply not have caught up yet.
async fn poll(state: &AppState, token: &str) -> Result<PollResponse, ApiError> {
    let repo = PairingRepository::new(state.db_pool.clone());
    let Some(row) = repo.find(token).await? else {
        return Ok(PollResponse::Pending);
    };

    match row.poll_outcome_at(Utc::now()) {
        PollOutcome::Pending => Ok(PollResponse::Pending),
        PollOutcome::Expired => Ok(PollResponse::Expired),
        PollOutcome::Success { telegram_id } => {
            // The webhook upserts the profile before claiming the token, so
            // a claimed token without a ledger row is a real inconsistency.
            let profile = ProfileRepository::new(state.db_pool.clone())
                .find_by_telegram_id(telegram_id)
                .await?
                .ok_or_else(|| {
                    ApiError::Internal(format!("claimed token {token} has no ledger row"))
                })?;

            let session = state.issuer.issue(&profile.session_user())?;
            Ok(PollResponse::Success {
                session,
                is_subscribed: profile.is_subscribed(),
            })
        }
    }
}

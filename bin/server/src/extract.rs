//! Authentication extractors for Axum.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use habbiter_core::TelegramId;
use habbiter_platform_access::{AccessClaims, AuthenticationError};
use std::sync::Arc;

/// Extractor for routes that require a valid access token.
///
/// Verification is stateless: the bearer token's signature, expiry, and
/// kind are checked against the issuer; no session table is consulted.
pub struct RequireSession(pub AccessClaims);

impl RequireSession {
    /// The Telegram account the session belongs to.
    #[must_use]
    pub fn telegram_id(&self) -> TelegramId {
        TelegramId::new(self.0.telegram_id)
    }
}

impl<S> FromRequestParts<S> for RequireSession
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    ApiError::Authentication(AuthenticationError::InvalidToken {
                        reason: "missing bearer token".to_string(),
                    })
                })?;

        let claims = app_state.issuer.verify_access(bearer.token())?;
        Ok(Self(claims))
    }
}

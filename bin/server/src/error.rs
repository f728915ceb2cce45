//! API error responses.
//!
//! Every handler failure becomes structured JSON with an `error` field and
//! an appropriate status; handlers never panic outward. The one special
//! shape is `SubscriptionUnavailable`: the oracle could not be reached, and
//! the body says so distinctly (`errorType: "network_error"`,
//! `isSubscribed: null`) so clients never read an outage as "not a member".

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use habbiter_platform_access::AuthenticationError;
use habbiter_telegram::BotApiError;
use serde_json::json;

/// Errors returned by API handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The request body could not be used.
    BadRequest(String),
    /// Login or session verification failed.
    Authentication(AuthenticationError),
    /// The subscription oracle gave no answer; transient by nature.
    SubscriptionUnavailable(String),
    /// Database failure.
    Database(sqlx::Error),
    /// Anything else that should not reach the client in detail.
    Internal(String),
}

impl From<AuthenticationError> for ApiError {
    fn from(e: AuthenticationError) -> Self {
        Self::Authentication(e)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        Self::Database(e)
    }
}

impl From<BotApiError> for ApiError {
    fn from(e: BotApiError) -> Self {
        // Api-level refusals (bad channel id, bot not admin) are just as
        // undetermined from the member's point of view as a transport
        // failure: none of them mean "left the channel".
        Self::SubscriptionUnavailable(e.to_string())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Authentication(e) => match e {
                AuthenticationError::MissingField { .. }
                | AuthenticationError::MalformedPayload { .. } => StatusCode::BAD_REQUEST,
                _ => StatusCode::UNAUTHORIZED,
            },
            Self::SubscriptionUnavailable(_) | Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            Self::BadRequest(message) => json!({ "error": message }),
            Self::Authentication(e) => json!({ "error": e.to_string() }),
            Self::SubscriptionUnavailable(reason) => {
                tracing::warn!(%reason, "subscription oracle unavailable");
                json!({
                    "error": "Failed to verify subscription",
                    "errorType": "network_error",
                    "isSubscribed": null,
                })
            }
            Self::Database(e) => {
                tracing::error!(error = %e, "database error");
                json!({ "error": "Internal server error" })
            }
            Self::Internal(message) => {
                tracing::error!(%message, "internal error");
                json!({ "error": "Internal server error" })
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

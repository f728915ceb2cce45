//! HTTP routes.

pub mod auth;
pub mod pairing;
pub mod subscription;
pub mod webhook;

use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;

/// Assembles the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/telegram-auth", post(auth::telegram_auth))
        .route("/telegram-auth-miniapp", post(auth::telegram_auth_miniapp))
        .route("/refresh-session", post(auth::refresh_session))
        .route("/generate-auth-token", post(pairing::token_action))
        .route("/check-subscription", post(subscription::check_subscription))
        .route("/subscription-status", get(subscription::subscription_status))
        .route("/telegram-webhook", post(webhook::telegram_webhook))
        .with_state(state)
}

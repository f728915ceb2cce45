//! Wire types for the authentication flow.
//!
//! These are the request and response bodies exchanged between the client
//! orchestrator and the server's auth endpoints. Key names follow the JSON
//! the endpoints actually speak: session internals stay snake_case, the
//! flow-level flags are camelCase.

use crate::session::Session;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request body for the embedded-app login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitDataRequest {
    /// The raw `initData` query string, exactly as the platform handed it
    /// over.
    pub init_data: String,
}

/// Response body for both login endpoints.
///
/// A session is issued whenever the login data verifies, subscribed or
/// not; the client decides what the user may reach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub session: Session,
    pub is_subscribed: bool,
}

/// Request body for the pairing-token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TokenAction {
    /// Mint a new pending token.
    Generate,
    /// Ask what happened to a previously minted token.
    Poll { token: String },
}

/// Response to a `generate` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub token: String,
}

/// Response to a `poll` action.
///
/// Unknown tokens report `pending`, not an error: the webhook may simply
/// not have caught up yet, and polling must keep its cadence either way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PollResponse {
    Pending,
    Expired,
    #[serde(rename_all = "camelCase")]
    Success {
        session: Session,
        is_subscribed: bool,
    },
}

/// Request body for the session refresh endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response body for the manual subscription check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    pub is_subscribed: bool,
    pub checked_at: DateTime<Utc>,
}

/// Response body for the cached subscription-status read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    /// The cached answer.
    pub is_subscribed: bool,
    /// True when the cache window has lapsed and the caller should run a
    /// live check before trusting the answer.
    pub needs_check: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_action_wire_shapes() {
        let generate: TokenAction =
            serde_json::from_str(r#"{"action":"generate"}"#).expect("parse");
        assert_eq!(generate, TokenAction::Generate);

        let poll: TokenAction =
            serde_json::from_str(r#"{"action":"poll","token":"01JF2Z"}"#).expect("parse");
        assert_eq!(
            poll,
            TokenAction::Poll {
                token: "01JF2Z".to_string()
            }
        );
    }

    #[test]
    fn poll_response_tags_status() {
        let pending = serde_json::to_value(PollResponse::Pending).expect("serialize");
        assert_eq!(pending, serde_json::json!({"status": "pending"}));

        let expired = serde_json::to_value(PollResponse::Expired).expect("serialize");
        assert_eq!(expired, serde_json::json!({"status": "expired"}));
    }

    #[test]
    fn init_data_request_uses_camel_case() {
        let request: InitDataRequest =
            serde_json::from_str(r#"{"initData":"auth_date=1&hash=ab"}"#).expect("parse");
        assert_eq!(request.init_data, "auth_date=1&hash=ab");
    }

    #[test]
    fn subscription_status_uses_camel_case() {
        let status = SubscriptionStatus {
            is_subscribed: true,
            needs_check: false,
        };
        let json = serde_json::to_value(status).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"isSubscribed": true, "needsCheck": false})
        );
    }
}

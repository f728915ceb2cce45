//! Typed access to the auth server's endpoints.
//!
//! `AuthApi` is the seam the orchestrator, guard, and poller run against;
//! `PlatformApi` is the HTTP implementation.

use crate::config::ClientConfig;
use crate::error::ClientError;
use async_trait::async_trait;
use habbiter_platform_access::{
    AuthResponse, CheckOutcome, InitDataRequest, PollResponse, RefreshRequest, Session,
    SubscriptionStatus, TokenAction, TokenGrant,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Operations the auth server exposes to clients.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Verifies a Login Widget payload and exchanges it for a session.
    async fn authenticate_widget(
        &self,
        payload: &serde_json::Value,
    ) -> Result<AuthResponse, ClientError>;

    /// Verifies embedded-app init data and exchanges it for a session.
    async fn authenticate_init_data(&self, init_data: &str) -> Result<AuthResponse, ClientError>;

    /// Mints a pairing token for the deep-link flow.
    async fn generate_token(&self) -> Result<TokenGrant, ClientError>;

    /// Asks what happened to a pairing token.
    async fn poll_token(&self, token: &str) -> Result<PollResponse, ClientError>;

    /// Runs an authoritative subscription check for the session's account.
    async fn check_subscription(&self, access_token: &str) -> Result<CheckOutcome, ClientError>;

    /// Reads the cached subscription state for the session's account.
    async fn subscription_status(
        &self,
        access_token: &str,
    ) -> Result<SubscriptionStatus, ClientError>;

    /// Exchanges a refresh token for a fresh session.
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, ClientError>;
}

/// Error body the server attaches to non-success responses.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: Option<String>,
    error_type: Option<String>,
}

fn classify_error(status: u16, body: &ErrorBody) -> ClientError {
    let message = body
        .error
        .clone()
        .unwrap_or_else(|| format!("request failed with status {status}"));

    // The server reports its own upstream outages with a distinct marker;
    // those are "could not determine", not a rejection.
    if body.error_type.as_deref() == Some("network_error") {
        ClientError::Network { reason: message }
    } else {
        ClientError::Api { status, message }
    }
}

/// HTTP client for the auth server.
pub struct PlatformApi {
    http: reqwest::Client,
    config: ClientConfig,
}

impl PlatformApi {
    /// Creates a client, validating the configuration first.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self {
            http: reqwest::Client::new(),
            config,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.config.server_url.trim_end_matches('/'))
    }

    async fn post<B, T>(
        &self,
        path: &str,
        body: &B,
        bearer: Option<&str>,
    ) -> Result<T, ClientError>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned,
    {
        let mut request = self
            .http
            .post(self.endpoint(path))
            .header("apikey", &self.config.api_key)
            .json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| ClientError::Network {
            reason: e.to_string(),
        })?;
        Self::read_json(response).await
    }

    async fn get<T>(&self, path: &str, bearer: Option<&str>) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let mut request = self
            .http
            .get(self.endpoint(path))
            .header("apikey", &self.config.api_key);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| ClientError::Network {
            reason: e.to_string(),
        })?;
        Self::read_json(response).await
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            response.json().await.map_err(|e| ClientError::Network {
                reason: format!("malformed response: {e}"),
            })
        } else {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            Err(classify_error(status.as_u16(), &body))
        }
    }
}

#[async_trait]
impl AuthApi for PlatformApi {
    async fn authenticate_widget(
        &self,
        payload: &serde_json::Value,
    ) -> Result<AuthResponse, ClientError> {
        self.post("telegram-auth", payload, None).await
    }

    async fn authenticate_init_data(&self, init_data: &str) -> Result<AuthResponse, ClientError> {
        let request = InitDataRequest {
            init_data: init_data.to_string(),
        };
        self.post("telegram-auth-miniapp", &request, None).await
    }

    async fn generate_token(&self) -> Result<TokenGrant, ClientError> {
        self.post("generate-auth-token", &TokenAction::Generate, None)
            .await
    }

    async fn poll_token(&self, token: &str) -> Result<PollResponse, ClientError> {
        let action = TokenAction::Poll {
            token: token.to_string(),
        };
        self.post("generate-auth-token", &action, None).await
    }

    async fn check_subscription(&self, access_token: &str) -> Result<CheckOutcome, ClientError> {
        self.post("check-subscription", &serde_json::json!({}), Some(access_token))
            .await
    }

    async fn subscription_status(
        &self,
        access_token: &str,
    ) -> Result<SubscriptionStatus, ClientError> {
        self.get("subscription-status", Some(access_token)).await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, ClientError> {
        let request = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };
        self.post("refresh-session", &request, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_network_marker_maps_to_network_error() {
        let body = ErrorBody {
            error: Some("Failed to verify subscription".to_string()),
            error_type: Some("network_error".to_string()),
        };

        let err = classify_error(500, &body);
        assert!(matches!(err, ClientError::Network { .. }));
    }

    #[test]
    fn plain_error_body_maps_to_api_error() {
        let body = ErrorBody {
            error: Some("Invalid authentication data".to_string()),
            error_type: None,
        };

        let err = classify_error(401, &body);
        assert_eq!(
            err,
            ClientError::Api {
                status: 401,
                message: "Invalid authentication data".to_string()
            }
        );
    }

    #[test]
    fn empty_error_body_falls_back_to_status() {
        let err = classify_error(502, &ErrorBody::default());
        assert!(matches!(
            err,
            ClientError::Api { status: 502, ref message } if message.contains("502")
        ));
    }

    #[test]
    fn endpoint_joins_without_duplicate_slash() {
        let api = PlatformApi::new(ClientConfig::new(
            "https://auth.habbiter.app/",
            "key",
            "habbiter_bot",
        ))
        .expect("valid config");

        assert_eq!(
            api.endpoint("telegram-auth"),
            "https://auth.habbiter.app/telegram-auth"
        );
    }

    #[test]
    fn invalid_config_is_rejected_before_any_request() {
        let result = PlatformApi::new(ClientConfig::new("", "key", "bot"));
        assert!(matches!(
            result,
            Err(ClientError::Configuration { .. })
        ));
    }
}

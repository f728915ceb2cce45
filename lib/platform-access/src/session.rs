//! Session issuance and verification.
//!
//! A session is a pair of HS256 tokens: a short-lived access token carrying
//! the subscription claim, and a long-lived refresh token that can be
//! exchanged for a fresh pair. Verification is stateless; the server holds
//! no session table.

use crate::error::AuthenticationError;
use chrono::Utc;
use habbiter_core::{TelegramId, UserId};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Access token lifetime: 1 hour.
pub const ACCESS_TOKEN_TTL_SECS: i64 = 60 * 60;

/// Refresh token lifetime: 2 weeks.
pub const REFRESH_TOKEN_TTL_SECS: i64 = 14 * 24 * 60 * 60;

/// Distinguishes access tokens from refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Application claims embedded in access tokens and session users.
///
/// `is_subscribed` is a hint frozen at issue time; routes that gate on it
/// re-check against the ledger once the hint goes stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppMetadata {
    pub is_subscribed: bool,
}

/// The user summary embedded in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    pub telegram_id: TelegramId,
    pub app_metadata: AppMetadata,
}

/// An issued session: the token pair plus the user it belongs to.
///
/// This is the wire shape clients store verbatim; they never need to open
/// the tokens themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Unix seconds at which the access token expires.
    pub expires_at: i64,
    pub user: SessionUser,
}

/// Claims inside an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// The user's platform ID in display form.
    pub sub: String,
    pub telegram_id: i64,
    pub app_metadata: AppMetadata,
    #[serde(rename = "typ")]
    pub token_kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

/// Claims inside a refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Unique token id.
    pub jti: String,
    /// The user's platform ID in display form.
    pub sub: String,
    pub telegram_id: i64,
    #[serde(rename = "typ")]
    pub token_kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

/// Mints and verifies session token pairs.
#[derive(Clone)]
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SessionIssuer {
    /// Creates an issuer with the given HS256 secret.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Issues a fresh session for the given user.
    pub fn issue(&self, user: &SessionUser) -> Result<Session, AuthenticationError> {
        let now = Utc::now().timestamp();
        let access_exp = now + ACCESS_TOKEN_TTL_SECS;

        let access_claims = AccessClaims {
            sub: user.id.to_string(),
            telegram_id: user.telegram_id.as_i64(),
            app_metadata: user.app_metadata.clone(),
            token_kind: TokenKind::Access,
            iat: now,
            exp: access_exp,
        };
        let refresh_claims = RefreshClaims {
            jti: Ulid::new().to_string(),
            sub: user.id.to_string(),
            telegram_id: user.telegram_id.as_i64(),
            token_kind: TokenKind::Refresh,
            iat: now,
            exp: now + REFRESH_TOKEN_TTL_SECS,
        };

        let access_token = self.encode(&access_claims)?;
        let refresh_token = self.encode(&refresh_claims)?;

        Ok(Session {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_at: access_exp,
            user: user.clone(),
        })
    }

    /// Verifies an access token and returns its claims.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, AuthenticationError> {
        let claims: AccessClaims = self.decode(token)?;
        if claims.token_kind != TokenKind::Access {
            return Err(AuthenticationError::WrongTokenKind { expected: "access" });
        }
        Ok(claims)
    }

    /// Verifies a refresh token and returns its claims.
    ///
    /// The caller looks the user up and issues a new pair; the old refresh
    /// token keeps working until its own expiry.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, AuthenticationError> {
        let claims: RefreshClaims = self.decode(token)?;
        if claims.token_kind != TokenKind::Refresh {
            return Err(AuthenticationError::WrongTokenKind {
                expected: "refresh",
            });
        }
        Ok(claims)
    }

    fn encode<C: Serialize>(&self, claims: &C) -> Result<String, AuthenticationError> {
        jsonwebtoken::encode(&Header::default(), claims, &self.encoding_key).map_err(|e| {
            AuthenticationError::TokenCreation {
                reason: e.to_string(),
            }
        })
    }

    fn decode<C: serde::de::DeserializeOwned>(
        &self,
        token: &str,
    ) -> Result<C, AuthenticationError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        jsonwebtoken::decode::<C>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AuthenticationError::TokenExpired
                }
                _ => AuthenticationError::InvalidToken {
                    reason: e.to_string(),
                },
            })
    }
}

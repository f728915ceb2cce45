//! Error types for the platform-access crate.

use std::fmt;

/// Errors from authentication operations.
///
/// These errors represent failures in verifying login data or session
/// tokens. Every variant means the caller must not treat the request as
/// authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    /// The login payload's hash does not match its contents.
    InvalidSignature,
    /// The login payload is older than the accepted window.
    StaleLogin { age_secs: i64 },
    /// A required field is absent from the login payload.
    MissingField { field: String },
    /// The login payload could not be parsed.
    MalformedPayload { reason: String },
    /// Session token validation failed.
    InvalidToken { reason: String },
    /// Session token has expired.
    TokenExpired,
    /// An access token was presented where a refresh token was expected,
    /// or the other way around.
    WrongTokenKind { expected: &'static str },
    /// Session token could not be created.
    TokenCreation { reason: String },
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSignature => {
                write!(f, "login signature does not match")
            }
            Self::StaleLogin { age_secs } => {
                write!(f, "login data is stale: {age_secs}s old")
            }
            Self::MissingField { field } => {
                write!(f, "missing required field: {field}")
            }
            Self::MalformedPayload { reason } => {
                write!(f, "malformed login payload: {reason}")
            }
            Self::InvalidToken { reason } => {
                write!(f, "invalid token: {reason}")
            }
            Self::TokenExpired => {
                write!(f, "token has expired")
            }
            Self::WrongTokenKind { expected } => {
                write!(f, "wrong token kind, expected {expected} token")
            }
            Self::TokenCreation { reason } => {
                write!(f, "failed to create session token: {reason}")
            }
        }
    }
}

impl std::error::Error for AuthenticationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_signature_display() {
        let err = AuthenticationError::InvalidSignature;
        assert!(err.to_string().contains("signature"));
    }

    #[test]
    fn stale_login_display() {
        let err = AuthenticationError::StaleLogin { age_secs: 7200 };
        assert!(err.to_string().contains("stale"));
        assert!(err.to_string().contains("7200"));
    }

    #[test]
    fn missing_field_display() {
        let err = AuthenticationError::MissingField {
            field: "auth_date".to_string(),
        };
        assert!(err.to_string().contains("auth_date"));
    }

    #[test]
    fn token_expired_display() {
        let err = AuthenticationError::TokenExpired;
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn wrong_token_kind_display() {
        let err = AuthenticationError::WrongTokenKind { expected: "refresh" };
        assert!(err.to_string().contains("refresh"));
    }
}

//! Error types for the client crate.
//!
//! The taxonomy matters more than the detail: configuration problems are
//! surfaced before any network call, definitive rejections come back as
//! `Api`, and anything that prevented an answer at all is `Network`. Gate
//! logic treats the three very differently.

use std::fmt;

/// Errors from client-side auth operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Required configuration is missing or malformed. No network call was
    /// attempted.
    Configuration { reason: String },
    /// The server answered with a non-success status.
    Api { status: u16, message: String },
    /// No definitive answer was obtained: transport failure, malformed
    /// response, or the server reporting its own upstream as unreachable.
    /// Never to be read as "not subscribed".
    Network { reason: String },
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { reason } => {
                write!(f, "configuration error: {reason}")
            }
            Self::Api { status, message } => {
                write!(f, "request rejected ({status}): {message}")
            }
            Self::Network { reason } => {
                write!(f, "network error: {reason}")
            }
        }
    }
}

impl std::error::Error for ClientError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_display() {
        let err = ClientError::Configuration {
            reason: "bot username is not set".to_string(),
        };
        assert!(err.to_string().contains("configuration"));
        assert!(err.to_string().contains("bot username"));
    }

    #[test]
    fn api_error_display() {
        let err = ClientError::Api {
            status: 401,
            message: "Invalid authentication data".to_string(),
        };
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("Invalid authentication data"));
    }

    #[test]
    fn network_error_display() {
        let err = ClientError::Network {
            reason: "connection reset".to_string(),
        };
        assert!(err.to_string().contains("network"));
    }
}

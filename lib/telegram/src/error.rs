//! Error types for Bot API calls.
//!
//! `Api` means Telegram understood the request and refused it; `Network` and
//! `Malformed` mean no answer was obtained at all. Membership callers must
//! keep the two apart: an errored check is "could not determine", never
//! "not a member".

use std::fmt;

/// Errors from Bot API operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotApiError {
    /// Transport failure before any API answer arrived.
    Network { reason: String },
    /// The API answered `ok: false`.
    Api { error_code: i64, description: String },
    /// The response body did not match the expected shape.
    Malformed { reason: String },
}

impl fmt::Display for BotApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network { reason } => {
                write!(f, "bot api unreachable: {reason}")
            }
            Self::Api {
                error_code,
                description,
            } => {
                write!(f, "bot api error {error_code}: {description}")
            }
            Self::Malformed { reason } => {
                write!(f, "malformed bot api response: {reason}")
            }
        }
    }
}

impl std::error::Error for BotApiError {}

//! Channel membership statuses and channel-id normalization.

use serde::{Deserialize, Serialize};

/// Membership status of a user within a channel, as reported by
/// `getChatMember`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
    /// A status this client does not know about. Treated as not subscribed.
    #[serde(other)]
    Unknown,
}

impl MembershipStatus {
    /// Whether this status counts as an active channel subscription.
    ///
    /// Restricted members are still in the channel, so they keep access.
    #[must_use]
    pub const fn grants_access(self) -> bool {
        matches!(
            self,
            Self::Creator | Self::Administrator | Self::Member | Self::Restricted
        )
    }
}

/// Normalizes a configured channel identifier for `getChatMember`.
///
/// Bare usernames get an `@` prefix. Identifiers that are already prefixed,
/// supergroup ids (`-100…`), or plain numeric ids pass through unchanged.
#[must_use]
pub fn normalize_channel_id(raw: &str) -> String {
    if raw.starts_with('@')
        || raw.starts_with("-100")
        || (!raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()))
    {
        raw.to_string()
    } else {
        format!("@{raw}")
    }
}

//! Platform access and authentication for habbiter.
//!
//! This crate provides:
//! - Login verification (`CredentialVerifier` over widget and embedded-app
//!   payloads)
//! - Session issuance (`SessionIssuer`, stateless HS256 token pairs)
//! - User profiles (`Profile` with cached subscription state)
//! - Deep-link pairing (`PairingToken` and its lifecycle)
//! - The wire types the auth endpoints speak
//!
//! # Access Control Model
//!
//! Identity comes from Telegram-signed login payloads; there are no
//! passwords. Access to the app is gated on membership in a Telegram
//! channel, checked against the Bot API and cached on the profile for a
//! bounded window.
//!
//! # Example
//!
//! ```
//! use habbiter_core::{TelegramId, UserId};
//! use habbiter_platform_access::{AppMetadata, SessionIssuer, SessionUser};
//!
//! let issuer = SessionIssuer::new(b"dev-secret");
//! let user = SessionUser {
//!     id: UserId::new(),
//!     telegram_id: TelegramId::new(111_222_333),
//!     app_metadata: AppMetadata {
//!         is_subscribed: true,
//!     },
//! };
//!
//! let session = issuer.issue(&user).expect("issue session");
//! let claims = issuer
//!     .verify_access(&session.access_token)
//!     .expect("freshly issued token verifies");
//!
//! assert_eq!(claims.telegram_id, 111_222_333);
//! assert!(claims.app_metadata.is_subscribed);
//! ```

pub mod assertion;
pub mod auth;
pub mod error;
pub mod pairing;
pub mod profile;
pub mod session;
pub mod verify;

// Re-export main types at crate root
pub use assertion::{InitData, TelegramAccount, WidgetAssertion};
pub use auth::{
    AuthResponse, CheckOutcome, InitDataRequest, PollResponse, RefreshRequest, SubscriptionStatus,
    TokenAction, TokenGrant,
};
pub use error::AuthenticationError;
pub use pairing::{PairingToken, PollOutcome, TokenStatus, token_from_start_command};
pub use profile::{Profile, SUBSCRIPTION_CACHE_TTL_DAYS};
pub use session::{
    AccessClaims, AppMetadata, RefreshClaims, Session, SessionIssuer, SessionUser, TokenKind,
};
pub use verify::{CredentialVerifier, SigningScheme, WIDGET_LOGIN_MAX_AGE_SECS};

//! Telegram Bot API access for the habbiter platform.
//!
//! This crate provides:
//!
//! - **Bot API client**: `getChatMember`, `sendMessage`, and callback-query
//!   answers over HTTPS
//! - **Membership model**: channel membership statuses and the accepted set
//!   that counts as an active subscription
//! - **Update types**: the webhook payloads the bot receives

pub mod api;
pub mod error;
pub mod membership;
pub mod update;

pub use api::{BotApi, InlineKeyboardButton, InlineKeyboardMarkup};
pub use error::BotApiError;
pub use membership::{MembershipStatus, normalize_channel_id};
pub use update::{CallbackQuery, Chat, IncomingMessage, Sender, Update};

//! Core domain types for the habbiter platform.
//!
//! This crate provides the identifier types shared by every other crate in
//! the workspace.

pub mod id;

pub use id::{CronRunId, SubscriptionCheckId, TelegramId, UserId};

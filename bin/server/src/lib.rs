//! Auth and subscription-gating server for habbiter.
//!
//! A small JSON API in front of the Telegram Bot API and Postgres:
//! login verification, deep-link pairing, subscription checks, the bot
//! webhook, and the periodic cache reconciler.

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod reconcile;
pub mod routes;
pub mod state;

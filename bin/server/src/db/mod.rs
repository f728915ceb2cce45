//! Database repositories.
//!
//! One repository per table, each owning its row-to-domain mapping. All
//! writers against `users` are full-row upserts keyed on `telegram_id`,
//! which makes last-write-wins the concurrency policy across the login
//! paths, the manual check, and the reconciler.

pub mod checks;
pub mod pairing;
pub mod profile;

pub use checks::{CheckMethod, CronLogRepository, SubscriptionCheckRepository};
pub use pairing::PairingRepository;
pub use profile::ProfileRepository;

//! Client-side auth orchestration for habbiter front ends.
//!
//! This crate is the controller behind the login and gating UI, kept
//! runtime-agnostic so web and native shells share it:
//!
//! - **Orchestrator**: picks the login path (embedded app vs deep link),
//!   drives the at-most-once auto login, and owns the installed session
//! - **Poller**: self-rescheduling pairing-token polling, serialized ticks
//! - **Guard**: the layered route gate (claim, cached ledger, live check)
//! - **Host seams**: traits the shell implements for init data, window
//!   handling, and durable token storage
//! - **Debug console**: a bounded observable log for on-device debugging
//!
//! Everything network-facing goes through [`AuthApi`]; the HTTP
//! implementation is [`PlatformApi`].

pub mod api;
pub mod config;
pub mod console;
pub mod error;
pub mod guard;
pub mod host;
pub mod orchestrator;
pub mod poll;

pub use api::{AuthApi, PlatformApi};
pub use config::ClientConfig;
pub use console::{CONSOLE_CAPACITY, DebugConsole, LogEntry, LogLevel};
pub use error::ClientError;
pub use guard::{AuthGuard, DEFAULT_PUBLIC_ROUTES, GateDecision};
pub use host::{
    BrowserKind, HostEnvironment, MemoryStorage, NavigationSlot, PAIRING_TOKEN_STORAGE_KEY,
    TokenStorage, UrlOpener,
};
pub use orchestrator::{AuthOrchestrator, AuthPath};
pub use poll::{POLL_INTERVAL, PollCancel, PollEnd, TokenPoller};

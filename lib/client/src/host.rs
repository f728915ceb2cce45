//! Host-environment seams.
//!
//! The orchestrator is runtime-agnostic: everything that touches the
//! platform the app runs on (the embedded-app bridge, window handling,
//! durable storage) arrives through these traits, implemented by the host
//! shell.

use std::sync::Mutex;

/// The storage key holding the in-flight pairing token.
///
/// A single fixed key: the token must survive a page reload so polling can
/// resume, and it is cleared on success.
pub const PAIRING_TOKEN_STORAGE_KEY: &str = "habbiter.pairing_token";

/// What kind of browser shell the app is running in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserKind {
    /// Telegram's own in-app browser.
    TelegramInApp,
    /// Safari on iOS, including WebKit shells.
    IosSafari,
    /// Anything else.
    Other,
}

impl BrowserKind {
    /// Whether the deep link should replace the current tab instead of
    /// opening a new window. In-app browsers and iOS Safari block or
    /// mangle new-window handoffs.
    #[must_use]
    pub const fn prefers_same_tab(self) -> bool {
        matches!(self, Self::TelegramInApp | Self::IosSafari)
    }
}

/// What the host knows about where the app is running.
pub trait HostEnvironment: Send + Sync {
    /// Raw init data when running inside the embedded app, `None` (or
    /// empty) otherwise.
    fn init_data(&self) -> Option<String>;

    /// The browser shell in use.
    fn browser_kind(&self) -> BrowserKind;
}

/// Durable single-slot storage for the in-flight pairing token.
pub trait TokenStorage: Send + Sync {
    fn load(&self) -> Option<String>;
    fn store(&self, token: &str);
    fn clear(&self);
}

/// A navigation target reserved ahead of time.
///
/// Popup blockers only allow window opens that happen synchronously inside
/// a user gesture. The slot is reserved in the gesture handler; the actual
/// URL arrives after the async token fetch.
pub trait NavigationSlot: Send {
    /// Points the reserved target at the URL.
    fn navigate(self: Box<Self>, url: &str);

    /// Releases the reserved target without navigating, closing any
    /// placeholder window.
    fn cancel(self: Box<Self>);
}

/// Opens navigation targets in whatever way the current shell allows.
pub trait UrlOpener: Send + Sync {
    /// Reserves a new-window target. Must be called synchronously within
    /// the user gesture that starts the login.
    fn preopen(&self) -> Box<dyn NavigationSlot>;

    /// Replaces the current tab. Same-tab navigation has no popup timing
    /// constraint, so this may happen after an async fetch.
    fn redirect(&self, url: &str);
}

/// In-memory token storage for native hosts and tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStorage for MemoryStorage {
    fn load(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn store(&self, token: &str) {
        *self
            .slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(token.to_string());
    }

    fn clear(&self) {
        *self
            .slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_app_browsers_prefer_same_tab() {
        assert!(BrowserKind::TelegramInApp.prefers_same_tab());
        assert!(BrowserKind::IosSafari.prefers_same_tab());
        assert!(!BrowserKind::Other.prefers_same_tab());
    }

    #[test]
    fn memory_storage_round_trips() {
        let storage = MemoryStorage::new();
        assert!(storage.load().is_none());

        storage.store("01JF2Z");
        assert_eq!(storage.load().as_deref(), Some("01JF2Z"));

        storage.clear();
        assert!(storage.load().is_none());
    }
}

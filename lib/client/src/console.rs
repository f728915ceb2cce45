//! In-app debug console.
//!
//! A bounded log the host UI can render while debugging auth flows on a
//! phone, where real devtools are out of reach. The console is an injected
//! service with explicit start/stop; while stopped, logging is a no-op.
//! Entries are mirrored to `tracing` so server-side collection still works.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// How many entries the console retains. Older entries are dropped.
pub const CONSOLE_CAPACITY: usize = 50;

/// Severity of a console entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// One captured log entry.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

type Subscriber = Arc<dyn Fn(&LogEntry) + Send + Sync>;

/// A bounded, observable log buffer.
///
/// Cloning shares the buffer; the orchestrator, poller, and guard all log
/// into the same console the host handed them.
#[derive(Clone)]
pub struct DebugConsole {
    inner: Arc<ConsoleInner>,
}

struct ConsoleInner {
    running: AtomicBool,
    entries: Mutex<VecDeque<LogEntry>>,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl DebugConsole {
    /// Creates a stopped console.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ConsoleInner {
                running: AtomicBool::new(false),
                entries: Mutex::new(VecDeque::with_capacity(CONSOLE_CAPACITY)),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Begins capturing entries.
    pub fn start(&self) {
        self.inner.running.store(true, Ordering::SeqCst);
    }

    /// Stops capturing. Retained entries stay readable.
    pub fn stop(&self) {
        self.inner.running.store(false, Ordering::SeqCst);
    }

    /// Whether the console is currently capturing.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Registers a callback invoked for every captured entry.
    pub fn subscribe(&self, subscriber: impl Fn(&LogEntry) + Send + Sync + 'static) {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(Arc::new(subscriber));
    }

    /// Records an entry if the console is running.
    ///
    /// Always mirrored to `tracing` regardless of console state, so turning
    /// the console off never silences diagnostics entirely.
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Debug => tracing::debug!(target: "habbiter_client", "{message}"),
            LogLevel::Info => tracing::info!(target: "habbiter_client", "{message}"),
            LogLevel::Warn => tracing::warn!(target: "habbiter_client", "{message}"),
            LogLevel::Error => tracing::error!(target: "habbiter_client", "{message}"),
        }

        if !self.is_running() {
            return;
        }

        let entry = LogEntry {
            at: Utc::now(),
            level,
            message,
        };

        {
            let mut entries = self
                .inner
                .entries
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if entries.len() == CONSOLE_CAPACITY {
                entries.pop_front();
            }
            entries.push_back(entry.clone());
        }

        let subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        for subscriber in subscribers.iter() {
            subscriber(&entry);
        }
    }

    /// A snapshot of the retained entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Drops all retained entries.
    pub fn clear(&self) {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }
}

impl Default for DebugConsole {
    fn default() -> Self {
        Self::new()
    }
}

//! The auth orchestrator.
//!
//! One instance lives for the whole app load. It picks the login path from
//! the host environment, drives the embedded-app auto login exactly once,
//! starts deep-link pairing with popup-safe window handling, and owns the
//! installed session.

use crate::api::AuthApi;
use crate::config::ClientConfig;
use crate::console::{DebugConsole, LogLevel};
use crate::error::ClientError;
use crate::host::{HostEnvironment, TokenStorage, UrlOpener};
use habbiter_platform_access::{AuthResponse, Session};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Which login surface the app should present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPath {
    /// Running inside the embedded app with init data available: log in
    /// automatically.
    MiniApp,
    /// Plain browser: offer the deep-link (and widget) login.
    DeepLink,
}

/// Drives the login flows and holds the installed session.
pub struct AuthOrchestrator {
    api: Arc<dyn AuthApi>,
    config: ClientConfig,
    env: Arc<dyn HostEnvironment>,
    opener: Arc<dyn UrlOpener>,
    storage: Arc<dyn TokenStorage>,
    console: DebugConsole,
    /// Latch for the embedded-app auto login. Re-entrant attempts are
    /// suppressed, not queued.
    mini_app_attempted: AtomicBool,
    session: Mutex<Option<Session>>,
}

impl AuthOrchestrator {
    /// Creates an orchestrator. Fails on incomplete configuration so the
    /// problem surfaces before any login attempt.
    pub fn new(
        api: Arc<dyn AuthApi>,
        config: ClientConfig,
        env: Arc<dyn HostEnvironment>,
        opener: Arc<dyn UrlOpener>,
        storage: Arc<dyn TokenStorage>,
        console: DebugConsole,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self {
            api,
            config,
            env,
            opener,
            storage,
            console,
            mini_app_attempted: AtomicBool::new(false),
            session: Mutex::new(None),
        })
    }

    /// Picks the login path for this app load.
    #[must_use]
    pub fn detect_path(&self) -> AuthPath {
        match self.env.init_data() {
            Some(data) if !data.is_empty() => AuthPath::MiniApp,
            _ => AuthPath::DeepLink,
        }
    }

    /// Attempts the embedded-app auto login, at most once per app load.
    ///
    /// Returns `Ok(None)` when there is no init data or the attempt already
    /// fired. A failure is surfaced as-is; there is no retry and no
    /// automatic fallback to the widget path.
    pub async fn try_mini_app_login(&self) -> Result<Option<AuthResponse>, ClientError> {
        let Some(init_data) = self.env.init_data().filter(|d| !d.is_empty()) else {
            return Ok(None);
        };

        if self
            .mini_app_attempted
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(None);
        }

        self.console
            .log(LogLevel::Info, "submitting embedded-app init data");
        let response = self.api.authenticate_init_data(&init_data).await?;
        self.install_session(response.session.clone());
        Ok(Some(response))
    }

    /// Starts a deep-link login.
    ///
    /// Must be called from the user-gesture scope: when a new window is
    /// needed, the target is reserved synchronously before the token fetch
    /// awaits, which is what keeps popup blockers out of the way. In-app
    /// browsers and iOS Safari get a same-tab redirect instead.
    ///
    /// The minted token is persisted before navigation so a page reload can
    /// resume polling.
    pub async fn begin_deep_link_login(&self) -> Result<String, ClientError> {
        let same_tab = self.env.browser_kind().prefers_same_tab();
        let slot = if same_tab {
            None
        } else {
            Some(self.opener.preopen())
        };

        let grant = match self.api.generate_token().await {
            Ok(grant) => grant,
            Err(e) => {
                if let Some(slot) = slot {
                    slot.cancel();
                }
                return Err(e);
            }
        };

        self.storage.store(&grant.token);
        let url = self.config.bot_deep_link(&grant.token);
        self.console
            .log(LogLevel::Info, "opening bot deep link for pairing");
        match slot {
            Some(slot) => slot.navigate(&url),
            None => self.opener.redirect(&url),
        }

        Ok(grant.token)
    }

    /// The persisted in-flight pairing token, if a login survived a reload.
    #[must_use]
    pub fn pending_token(&self) -> Option<String> {
        self.storage.load()
    }

    /// Finishes a deep-link login: installs the session and clears the
    /// persisted token.
    pub fn complete_pairing(&self, session: Session) {
        self.storage.clear();
        self.install_session(session);
    }

    /// Abandons an in-flight deep-link login (expired token, user cancel).
    pub fn abandon_pairing(&self) {
        self.storage.clear();
    }

    /// Installs a session as the current one.
    pub fn install_session(&self, session: Session) {
        *self
            .session
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(session);
    }

    /// The currently installed session, if any.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.session
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Drops the current session.
    pub fn sign_out(&self) {
        *self
            .session
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{BrowserKind, MemoryStorage, NavigationSlot};
    use async_trait::async_trait;
    use habbiter_core::{TelegramId, UserId};
    use habbiter_platform_access::{
        AppMetadata, CheckOutcome, PollResponse, SessionUser, SubscriptionStatus, TokenGrant,
    };
    use std::sync::atomic::AtomicUsize;

    fn test_session() -> Session {
        Session {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            token_type: "bearer".to_string(),
            expires_at: 0,
            user: SessionUser {
                id: UserId::new(),
                telegram_id: TelegramId::new(555),
                app_metadata: AppMetadata {
                    is_subscribed: true,
                },
            },
        }
    }

    /// Records the order of host and network interactions.
    #[derive(Default)]
    struct EventLog(Mutex<Vec<String>>);

    impl EventLog {
        fn push(&self, event: &str) {
            self.0.lock().expect("lock").push(event.to_string());
        }

        fn events(&self) -> Vec<String> {
            self.0.lock().expect("lock").clone()
        }
    }

    struct FakeEnv {
        init_data: Option<String>,
        browser: BrowserKind,
    }

    impl HostEnvironment for FakeEnv {
        fn init_data(&self) -> Option<String> {
            self.init_data.clone()
        }

        fn browser_kind(&self) -> BrowserKind {
            self.browser
        }
    }

    struct FakeSlot {
        log: Arc<EventLog>,
    }

    impl NavigationSlot for FakeSlot {
        fn navigate(self: Box<Self>, url: &str) {
            self.log.push(&format!("navigate {url}"));
        }

        fn cancel(self: Box<Self>) {
            self.log.push("cancel");
        }
    }

    struct FakeOpener {
        log: Arc<EventLog>,
    }

    impl UrlOpener for FakeOpener {
        fn preopen(&self) -> Box<dyn NavigationSlot> {
            self.log.push("preopen");
            Box::new(FakeSlot {
                log: self.log.clone(),
            })
        }

        fn redirect(&self, url: &str) {
            self.log.push(&format!("redirect {url}"));
        }
    }

    struct FakeApi {
        log: Arc<EventLog>,
        fail_generate: bool,
        init_logins: AtomicUsize,
    }

    #[async_trait]
    impl AuthApi for FakeApi {
        async fn authenticate_widget(
            &self,
            _payload: &serde_json::Value,
        ) -> Result<AuthResponse, ClientError> {
            unreachable!("not exercised")
        }

        async fn authenticate_init_data(
            &self,
            _init_data: &str,
        ) -> Result<AuthResponse, ClientError> {
            self.init_logins.fetch_add(1, Ordering::SeqCst);
            Ok(AuthResponse {
                session: test_session(),
                is_subscribed: true,
            })
        }

        async fn generate_token(&self) -> Result<TokenGrant, ClientError> {
            self.log.push("generate");
            if self.fail_generate {
                return Err(ClientError::Network {
                    reason: "connection reset".to_string(),
                });
            }
            Ok(TokenGrant {
                token: "01JF2Z".to_string(),
            })
        }

        async fn poll_token(&self, _token: &str) -> Result<PollResponse, ClientError> {
            unreachable!("not exercised")
        }

        async fn check_subscription(
            &self,
            _access_token: &str,
        ) -> Result<CheckOutcome, ClientError> {
            unreachable!("not exercised")
        }

        async fn subscription_status(
            &self,
            _access_token: &str,
        ) -> Result<SubscriptionStatus, ClientError> {
            unreachable!("not exercised")
        }

        async fn refresh_session(&self, _refresh_token: &str) -> Result<Session, ClientError> {
            unreachable!("not exercised")
        }
    }

    struct Fixture {
        orchestrator: AuthOrchestrator,
        log: Arc<EventLog>,
        storage: Arc<MemoryStorage>,
        api: Arc<FakeApi>,
    }

    fn fixture(init_data: Option<&str>, browser: BrowserKind, fail_generate: bool) -> Fixture {
        let log = Arc::new(EventLog::default());
        let storage = Arc::new(MemoryStorage::new());
        let api = Arc::new(FakeApi {
            log: log.clone(),
            fail_generate,
            init_logins: AtomicUsize::new(0),
        });

        let orchestrator = AuthOrchestrator::new(
            api.clone(),
            ClientConfig::new("https://auth.habbiter.app", "key", "habbiter_bot"),
            Arc::new(FakeEnv {
                init_data: init_data.map(ToString::to_string),
                browser,
            }),
            Arc::new(FakeOpener { log: log.clone() }),
            storage.clone(),
            DebugConsole::new(),
        )
        .expect("valid config");

        Fixture {
            orchestrator,
            log,
            storage,
            api,
        }
    }

    #[test]
    fn init_data_selects_the_mini_app_path() {
        let f = fixture(Some("auth_date=1&hash=ab"), BrowserKind::TelegramInApp, false);
        assert_eq!(f.orchestrator.detect_path(), AuthPath::MiniApp);
    }

    #[test]
    fn empty_init_data_falls_back_to_deep_link() {
        let f = fixture(Some(""), BrowserKind::Other, false);
        assert_eq!(f.orchestrator.detect_path(), AuthPath::DeepLink);

        let f = fixture(None, BrowserKind::Other, false);
        assert_eq!(f.orchestrator.detect_path(), AuthPath::DeepLink);
    }

    #[test]
    fn incomplete_configuration_is_rejected_at_construction() {
        let result = AuthOrchestrator::new(
            Arc::new(FakeApi {
                log: Arc::new(EventLog::default()),
                fail_generate: false,
                init_logins: AtomicUsize::new(0),
            }),
            ClientConfig::new("", "key", "bot"),
            Arc::new(FakeEnv {
                init_data: None,
                browser: BrowserKind::Other,
            }),
            Arc::new(FakeOpener {
                log: Arc::new(EventLog::default()),
            }),
            Arc::new(MemoryStorage::new()),
            DebugConsole::new(),
        );
        assert!(matches!(result, Err(ClientError::Configuration { .. })));
    }

    #[tokio::test]
    async fn mini_app_login_fires_at_most_once() {
        let f = fixture(Some("auth_date=1&hash=ab"), BrowserKind::TelegramInApp, false);

        let first = f.orchestrator.try_mini_app_login().await.expect("login");
        assert!(first.is_some());
        assert!(f.orchestrator.session().is_some());

        // Re-entrant effect runs are suppressed, not queued.
        let second = f.orchestrator.try_mini_app_login().await.expect("login");
        assert!(second.is_none());
        assert_eq!(f.api.init_logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn mini_app_login_without_init_data_is_a_no_op() {
        let f = fixture(None, BrowserKind::Other, false);
        let result = f.orchestrator.try_mini_app_login().await.expect("no-op");
        assert!(result.is_none());
        assert_eq!(f.api.init_logins.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn deep_link_reserves_the_window_before_the_token_fetch() {
        let f = fixture(None, BrowserKind::Other, false);

        let token = f.orchestrator.begin_deep_link_login().await.expect("token");
        assert_eq!(token, "01JF2Z");

        assert_eq!(
            f.log.events(),
            vec![
                "preopen",
                "generate",
                "navigate https://t.me/habbiter_bot?start=auth_01JF2Z",
            ]
        );
        assert_eq!(f.storage.load().as_deref(), Some("01JF2Z"));
    }

    #[tokio::test]
    async fn in_app_browser_uses_same_tab_redirect() {
        let f = fixture(None, BrowserKind::TelegramInApp, false);

        f.orchestrator.begin_deep_link_login().await.expect("token");
        assert_eq!(
            f.log.events(),
            vec![
                "generate",
                "redirect https://t.me/habbiter_bot?start=auth_01JF2Z",
            ]
        );
    }

    #[tokio::test]
    async fn failed_token_fetch_releases_the_reserved_window() {
        let f = fixture(None, BrowserKind::Other, true);

        let result = f.orchestrator.begin_deep_link_login().await;
        assert!(matches!(result, Err(ClientError::Network { .. })));
        assert_eq!(f.log.events(), vec!["preopen", "generate", "cancel"]);
        assert!(f.storage.load().is_none());
    }

    #[tokio::test]
    async fn pairing_completion_installs_session_and_clears_storage() {
        let f = fixture(None, BrowserKind::Other, false);
        f.orchestrator.begin_deep_link_login().await.expect("token");
        assert!(f.orchestrator.pending_token().is_some());

        f.orchestrator.complete_pairing(test_session());
        assert!(f.orchestrator.pending_token().is_none());
        assert!(f.orchestrator.session().is_some());
    }

    #[tokio::test]
    async fn abandoning_a_pairing_clears_the_token_only() {
        let f = fixture(None, BrowserKind::Other, false);
        f.orchestrator.begin_deep_link_login().await.expect("token");

        f.orchestrator.abandon_pairing();
        assert!(f.orchestrator.pending_token().is_none());
        assert!(f.orchestrator.session().is_none());
    }

    #[test]
    fn sign_out_drops_the_session() {
        let f = fixture(None, BrowserKind::Other, false);
        f.orchestrator.install_session(test_session());
        f.orchestrator.sign_out();
        assert!(f.orchestrator.session().is_none());
    }
}

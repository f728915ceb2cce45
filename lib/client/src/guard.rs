//! Route gating.
//!
//! Every route transition passes through the guard. The subscription check
//! is layered by cost: the claim embedded in the session is free, the cached
//! ledger read is one cheap call, and the live membership check is the
//! authoritative last resort. Only when all three say "not subscribed" does
//! the guard send the user to the subscribe page.
//!
//! Failure policy, fixed per call site: the automatic route check is
//! fail-closed (an undetermined answer gates), the interactive manual check
//! is fail-open (an undetermined answer keeps the user where they are and
//! surfaces the error).

use crate::api::AuthApi;
use crate::console::{DebugConsole, LogLevel};
use crate::error::ClientError;
use habbiter_platform_access::{CheckOutcome, Session};
use std::sync::Arc;

/// Routes reachable without a session.
pub const DEFAULT_PUBLIC_ROUTES: &[&str] = &["/login", "/subscribe"];

/// What the guard decided for a route transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Let the navigation through.
    Allow,
    /// No usable session; send the user to the login surface.
    RedirectToLogin,
    /// Authenticated but not subscribed (or not provably subscribed).
    RedirectToSubscribe,
}

/// The route gate.
pub struct AuthGuard {
    api: Arc<dyn AuthApi>,
    console: DebugConsole,
    public_routes: Vec<String>,
}

impl AuthGuard {
    /// Creates a guard with the default public routes.
    #[must_use]
    pub fn new(api: Arc<dyn AuthApi>, console: DebugConsole) -> Self {
        Self::with_public_routes(
            api,
            console,
            DEFAULT_PUBLIC_ROUTES.iter().map(ToString::to_string),
        )
    }

    /// Creates a guard with an explicit public-route list.
    #[must_use]
    pub fn with_public_routes(
        api: Arc<dyn AuthApi>,
        console: DebugConsole,
        public_routes: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            api,
            console,
            public_routes: public_routes.into_iter().collect(),
        }
    }

    /// Whether a route is reachable without authentication.
    #[must_use]
    pub fn is_public(&self, route: &str) -> bool {
        self.public_routes.iter().any(|r| r == route)
    }

    /// Evaluates a route transition.
    ///
    /// Zero network calls when the embedded claim already says subscribed.
    pub async fn evaluate(&self, route: &str, session: Option<&Session>) -> GateDecision {
        if self.is_public(route) {
            return GateDecision::Allow;
        }

        let Some(session) = session else {
            return GateDecision::RedirectToLogin;
        };

        // Tier 1: the claim frozen into the session at issue time.
        if session.user.app_metadata.is_subscribed {
            return GateDecision::Allow;
        }

        // Tier 2: the cached ledger row. A fresh positive answer is enough;
        // anything else falls through to the live check.
        match self.api.subscription_status(&session.access_token).await {
            Ok(status) if status.is_subscribed && !status.needs_check => {
                return GateDecision::Allow;
            }
            Ok(_) => {}
            Err(e) => {
                self.console
                    .log(LogLevel::Warn, format!("cached status read failed: {e}"));
            }
        }

        // Tier 3: the live membership check, the authority on the matter.
        match self.api.check_subscription(&session.access_token).await {
            Ok(outcome) if outcome.is_subscribed => GateDecision::Allow,
            Ok(_) => GateDecision::RedirectToSubscribe,
            Err(ClientError::Api { status: 401, .. }) => {
                // The session itself is no longer accepted.
                GateDecision::RedirectToLogin
            }
            Err(e) => {
                // Fail closed: an undetermined answer gates. The subscribe
                // page offers the fail-open manual check as the way back in.
                self.console
                    .log(LogLevel::Warn, format!("live check undetermined: {e}"));
                GateDecision::RedirectToSubscribe
            }
        }
    }

    /// The interactive "I subscribed" check.
    ///
    /// Fail-open: a transport failure propagates as an error for the UI to
    /// show, and the caller leaves the user where they are instead of
    /// gating on an answer that was never obtained.
    pub async fn manual_check(&self, session: &Session) -> Result<CheckOutcome, ClientError> {
        self.api.check_subscription(&session.access_token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use habbiter_core::{TelegramId, UserId};
    use habbiter_platform_access::{
        AppMetadata, AuthResponse, PollResponse, SessionUser, SubscriptionStatus, TokenGrant,
    };
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn session_with_claim(is_subscribed: bool) -> Session {
        Session {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            token_type: "bearer".to_string(),
            expires_at: 0,
            user: SessionUser {
                id: UserId::new(),
                telegram_id: TelegramId::new(555),
                app_metadata: AppMetadata { is_subscribed },
            },
        }
    }

    /// Mock server with scripted answers for the two guard tiers.
    struct GateApi {
        status: Mutex<Result<SubscriptionStatus, ClientError>>,
        check: Mutex<Result<CheckOutcome, ClientError>>,
        status_calls: AtomicUsize,
        check_calls: AtomicUsize,
    }

    impl GateApi {
        fn new(
            status: Result<SubscriptionStatus, ClientError>,
            check: Result<CheckOutcome, ClientError>,
        ) -> Arc<Self> {
            Arc::new(Self {
                status: Mutex::new(status),
                check: Mutex::new(check),
                status_calls: AtomicUsize::new(0),
                check_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl AuthApi for GateApi {
        async fn authenticate_widget(
            &self,
            _payload: &serde_json::Value,
        ) -> Result<AuthResponse, ClientError> {
            unreachable!("not used by the guard")
        }

        async fn authenticate_init_data(
            &self,
            _init_data: &str,
        ) -> Result<AuthResponse, ClientError> {
            unreachable!("not used by the guard")
        }

        async fn generate_token(&self) -> Result<TokenGrant, ClientError> {
            unreachable!("not used by the guard")
        }

        async fn poll_token(&self, _token: &str) -> Result<PollResponse, ClientError> {
            unreachable!("not used by the guard")
        }

        async fn check_subscription(
            &self,
            _access_token: &str,
        ) -> Result<CheckOutcome, ClientError> {
            self.check_calls.fetch_add(1, Ordering::SeqCst);
            self.check.lock().expect("lock").clone()
        }

        async fn subscription_status(
            &self,
            _access_token: &str,
        ) -> Result<SubscriptionStatus, ClientError> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            self.status.lock().expect("lock").clone()
        }

        async fn refresh_session(&self, _refresh_token: &str) -> Result<Session, ClientError> {
            unreachable!("not used by the guard")
        }
    }

    fn fresh_status(is_subscribed: bool) -> Result<SubscriptionStatus, ClientError> {
        Ok(SubscriptionStatus {
            is_subscribed,
            needs_check: false,
        })
    }

    fn checked(is_subscribed: bool) -> Result<CheckOutcome, ClientError> {
        Ok(CheckOutcome {
            is_subscribed,
            checked_at: chrono::Utc::now(),
        })
    }

    fn network_err<T>() -> Result<T, ClientError> {
        Err(ClientError::Network {
            reason: "connection reset".to_string(),
        })
    }

    fn guard(api: Arc<GateApi>) -> AuthGuard {
        AuthGuard::new(api, DebugConsole::new())
    }

    #[tokio::test]
    async fn public_route_needs_no_session() {
        let api = GateApi::new(fresh_status(false), checked(false));
        let decision = guard(api.clone()).evaluate("/login", None).await;
        assert_eq!(decision, GateDecision::Allow);
        assert_eq!(api.status_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn protected_route_without_session_redirects_to_login() {
        let api = GateApi::new(fresh_status(true), checked(true));
        let decision = guard(api).evaluate("/habits", None).await;
        assert_eq!(decision, GateDecision::RedirectToLogin);
    }

    #[tokio::test]
    async fn subscribed_claim_allows_with_zero_calls() {
        let api = GateApi::new(fresh_status(false), checked(false));
        let session = session_with_claim(true);

        let decision = guard(api.clone()).evaluate("/habits", Some(&session)).await;
        assert_eq!(decision, GateDecision::Allow);
        assert_eq!(api.status_calls.load(Ordering::SeqCst), 0);
        assert_eq!(api.check_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fresh_cached_positive_skips_the_live_check() {
        let api = GateApi::new(fresh_status(true), network_err());
        let session = session_with_claim(false);

        let decision = guard(api.clone()).evaluate("/habits", Some(&session)).await;
        assert_eq!(decision, GateDecision::Allow);
        assert_eq!(api.check_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stale_cache_falls_through_to_live_check_that_resubscribed() {
        // DB says false but stale; the member resubscribed in the meantime.
        let api = GateApi::new(
            Ok(SubscriptionStatus {
                is_subscribed: false,
                needs_check: true,
            }),
            checked(true),
        );
        let session = session_with_claim(false);

        let decision = guard(api.clone()).evaluate("/habits", Some(&session)).await;
        assert_eq!(decision, GateDecision::Allow);
        assert_eq!(api.check_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn all_three_tiers_negative_gates() {
        let api = GateApi::new(fresh_status(false), checked(false));
        let session = session_with_claim(false);

        let decision = guard(api).evaluate("/habits", Some(&session)).await;
        assert_eq!(decision, GateDecision::RedirectToSubscribe);
    }

    #[tokio::test]
    async fn automatic_check_fails_closed_on_network_error() {
        let api = GateApi::new(network_err(), network_err());
        let session = session_with_claim(false);

        let decision = guard(api).evaluate("/habits", Some(&session)).await;
        assert_eq!(decision, GateDecision::RedirectToSubscribe);
    }

    #[tokio::test]
    async fn rejected_session_redirects_to_login() {
        let api = GateApi::new(
            fresh_status(false),
            Err(ClientError::Api {
                status: 401,
                message: "token expired".to_string(),
            }),
        );
        let session = session_with_claim(false);

        let decision = guard(api).evaluate("/habits", Some(&session)).await;
        assert_eq!(decision, GateDecision::RedirectToLogin);
    }

    #[tokio::test]
    async fn manual_check_fails_open_by_propagating_the_error() {
        let api = GateApi::new(fresh_status(false), network_err());
        let session = session_with_claim(false);

        let result = guard(api).manual_check(&session).await;
        assert!(matches!(result, Err(ClientError::Network { .. })));
    }

    #[tokio::test]
    async fn manual_check_reports_a_definitive_answer() {
        let api = GateApi::new(fresh_status(false), checked(true));
        let session = session_with_claim(false);

        let outcome = guard(api).manual_check(&session).await.expect("outcome");
        assert!(outcome.is_subscribed);
    }
}

//! Pairing-token polling.
//!
//! The web client cannot receive bot-side events, so it polls the token
//! endpoint until the webhook claims the token. The next tick is scheduled
//! only after the current request resolves; a slow round trip can never
//! stack overlapping polls the way a fixed-rate interval would.

use crate::api::AuthApi;
use crate::console::{DebugConsole, LogLevel};
use habbiter_platform_access::{PollResponse, Session};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Gap between the end of one poll and the start of the next.
pub const POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// How a polling session ended.
#[derive(Debug, Clone)]
pub enum PollEnd {
    /// The token was claimed; a session is ready to install.
    Success {
        session: Session,
        is_subscribed: bool,
    },
    /// The token aged out unclaimed. The user must start over.
    Expired,
    /// The host cancelled polling (unmount, navigation away).
    Cancelled,
}

/// A handle that stops a running poll from outside.
#[derive(Debug, Clone)]
pub struct PollCancel(Arc<AtomicBool>);

impl PollCancel {
    /// Requests cancellation. The loop notices between ticks.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Polls a pairing token until a terminal outcome.
pub struct TokenPoller {
    api: Arc<dyn AuthApi>,
    console: DebugConsole,
    interval: Duration,
    cancelled: Arc<AtomicBool>,
}

impl TokenPoller {
    /// Creates a poller with the standard 2 s gap.
    #[must_use]
    pub fn new(api: Arc<dyn AuthApi>, console: DebugConsole) -> Self {
        Self::with_interval(api, console, POLL_INTERVAL)
    }

    /// Creates a poller with a custom gap.
    #[must_use]
    pub fn with_interval(api: Arc<dyn AuthApi>, console: DebugConsole, interval: Duration) -> Self {
        Self {
            api,
            console,
            interval,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A handle the host can use to stop this poller.
    #[must_use]
    pub fn cancel_handle(&self) -> PollCancel {
        PollCancel(self.cancelled.clone())
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Runs the poll loop until success, expiry, or cancellation.
    ///
    /// A failed tick is logged and the loop keeps its cadence; only the
    /// terminal outcomes stop it.
    pub async fn run(&self, token: &str) -> PollEnd {
        loop {
            if self.is_cancelled() {
                return PollEnd::Cancelled;
            }

            match self.api.poll_token(token).await {
                Ok(PollResponse::Success {
                    session,
                    is_subscribed,
                }) => {
                    self.console.log(LogLevel::Info, "pairing token claimed");
                    return PollEnd::Success {
                        session,
                        is_subscribed,
                    };
                }
                Ok(PollResponse::Expired) => {
                    self.console
                        .log(LogLevel::Warn, "pairing token expired before claim");
                    return PollEnd::Expired;
                }
                Ok(PollResponse::Pending) => {}
                Err(e) => {
                    self.console
                        .log(LogLevel::Warn, format!("poll tick failed: {e}"));
                }
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use async_trait::async_trait;
    use habbiter_core::{TelegramId, UserId};
    use habbiter_platform_access::{
        AppMetadata, AuthResponse, CheckOutcome, SessionUser, SubscriptionStatus, TokenGrant,
    };
    use std::collections::VecDeque;
    use std::sync::Mutex;
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

    /// Plays back a fixed sequence of poll responses, then repeats the last.
    struct ScriptedApi {
        responses: Mutex<VecDeque<Result<PollResponse, ClientError>>>,
        polls: AtomicUsize,
    }

    impl ScriptedApi {
        fn new(responses: Vec<Result<PollResponse, ClientError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                polls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AuthApi for ScriptedApi {
        async fn authenticate_widget(
            &self,
            _payload: &serde_json::Value,
        ) -> Result<AuthResponse, ClientError> {
            unreachable!("not used by the poller")
        }

        async fn authenticate_init_data(
            &self,
            _init_data: &str,
        ) -> Result<AuthResponse, ClientError> {
            unreachable!("not used by the poller")
        }

        async fn generate_token(&self) -> Result<TokenGrant, ClientError> {
            unreachable!("not used by the poller")
        }

        async fn poll_token(&self, _token: &str) -> Result<PollResponse, ClientError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().expect("lock");
            if responses.len() > 1 {
                responses.pop_front().expect("non-empty")
            } else {
                responses.front().cloned().expect("non-empty")
            }
        }

        async fn check_subscription(
            &self,
            _access_token: &str,
        ) -> Result<CheckOutcome, ClientError> {
            unreachable!("not used by the poller")
        }

        async fn subscription_status(
            &self,
            _access_token: &str,
        ) -> Result<SubscriptionStatus, ClientError> {
            unreachable!("not used by the poller")
        }

        async fn refresh_session(&self, _refresh_token: &str) -> Result<Session, ClientError> {
            unreachable!("not used by the poller")
        }
    }

    fn poller(api: Arc<ScriptedApi>) -> TokenPoller {
        TokenPoller::new(api, DebugConsole::new())
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_success_after_pending_ticks() {
        let api = Arc::new(ScriptedApi::new(vec![
            Ok(PollResponse::Pending),
            Ok(PollResponse::Pending),
            Ok(PollResponse::Success {
                session: test_session(),
                is_subscribed: true,
            }),
        ]));

        let end = poller(api.clone()).run("01JF2Z").await;
        assert!(matches!(end, PollEnd::Success { is_subscribed: true, .. }));
        assert_eq!(api.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_token_stops_polling() {
        let api = Arc::new(ScriptedApi::new(vec![
            Ok(PollResponse::Pending),
            Ok(PollResponse::Expired),
        ]));

        let end = poller(api.clone()).run("01JF2Z").await;
        assert!(matches!(end, PollEnd::Expired));
        assert_eq!(api.polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_tick_is_skipped_not_fatal() {
        let api = Arc::new(ScriptedApi::new(vec![
            Err(ClientError::Network {
                reason: "connection reset".to_string(),
            }),
            Ok(PollResponse::Success {
                session: test_session(),
                is_subscribed: true,
            }),
        ]));

        let end = poller(api.clone()).run("01JF2Z").await;
        assert!(matches!(end, PollEnd::Success { .. }));
        assert_eq!(api.polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_wins_before_the_next_tick() {
        let api = Arc::new(ScriptedApi::new(vec![Ok(PollResponse::Pending)]));

        let poller = poller(api.clone());
        let cancel = poller.cancel_handle();

        let run = tokio::spawn(async move { poller.run("01JF2Z").await });
        // Let at least one tick go through, then cancel.
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();

        let end = run.await.expect("join");
        assert!(matches!(end, PollEnd::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_are_spaced_by_the_interval() {
        let api = Arc::new(ScriptedApi::new(vec![Ok(PollResponse::Pending)]));
        let poller = TokenPoller::with_interval(
            api.clone(),
            DebugConsole::new(),
            Duration::from_millis(2000),
        );
        let cancel = poller.cancel_handle();

        let run = tokio::spawn(async move { poller.run("01JF2Z").await });
        // Three intervals of virtual time permit at most four polls.
        tokio::time::sleep(Duration::from_millis(6100)).await;
        cancel.cancel();
        run.await.expect("join");

        let polls = api.polls.load(Ordering::SeqCst);
        assert!((2..=4).contains(&polls), "got {polls} polls");
    }
}

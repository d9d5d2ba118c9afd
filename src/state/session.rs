//! Process-wide session state machine.
//!
//! STATES
//! ======
//! `Unknown` (initial, still loading) → `Anonymous` | `Authenticated`.
//! Mutation happens only through the four auth operations; everything else
//! observes snapshots over a watch channel.
//!
//! STARTUP CHECK
//! =============
//! The first mount runs one `/auth/me` check. The guard lives under an
//! async mutex, so rapid re-invocation (mount/unmount churn) still issues
//! at most one network call. Login and register reset the guard: a later
//! full reload must re-validate against the server instead of trusting
//! local state.

use std::sync::Arc;

use tokio::sync::watch;

use crate::net::api::ApiError;
use crate::net::types::{AuthEnvelope, UserRecord};
use crate::notify::Notifier;
use crate::services::auth::{AuthService, CurrentUser};
use crate::util::decrypt::resolve_email;

/// Where the session machine currently is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    Unknown,
    Anonymous,
    Authenticated,
}

/// Value snapshot published to subscribers on every transition.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    pub user: Option<UserRecord>,
    pub authenticated: bool,
    /// True only while the startup check has not yet resolved.
    pub loading: bool,
}

/// Result of a login/register attempt, as reported to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl SessionOutcome {
    fn ok() -> Self {
        Self { success: true, error: None }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self { success: false, error: Some(message.into()) }
    }
}

struct SessionState {
    phase: SessionPhase,
    user: Option<UserRecord>,
}

struct CheckGuard {
    checked: bool,
}

/// The session singleton. Share via `Arc`; all mutation entry points take
/// `&self`.
pub struct Session {
    auth: AuthService,
    notifier: Arc<dyn Notifier>,
    encryption_key: String,
    state: std::sync::Mutex<SessionState>,
    check: tokio::sync::Mutex<CheckGuard>,
    tx: watch::Sender<SessionSnapshot>,
}

impl Session {
    #[must_use]
    pub fn new(auth: AuthService, notifier: Arc<dyn Notifier>, encryption_key: impl Into<String>) -> Self {
        let initial = SessionSnapshot { user: None, authenticated: false, loading: true };
        let (tx, _rx) = watch::channel(initial);
        Self {
            auth,
            notifier,
            encryption_key: encryption_key.into(),
            state: std::sync::Mutex::new(SessionState { phase: SessionPhase::Unknown, user: None }),
            check: tokio::sync::Mutex::new(CheckGuard { checked: false }),
            tx,
        }
    }

    /// Current snapshot, without subscribing.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        snapshot_of(&self.lock_state())
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.lock_state().phase
    }

    /// Subscribe to session transitions. Each transition publishes a fresh
    /// [`SessionSnapshot`].
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    /// Startup check: validate the session with the server exactly once.
    ///
    /// A check that already ran (and was not reset by login/register) is a
    /// no-op. Failures and 401s resolve silently to `Anonymous`; loading
    /// always ends false.
    pub async fn ensure_checked(&self) {
        let mut guard = self.check.lock().await;
        if guard.checked {
            return;
        }

        match self.auth.current_user().await {
            Ok(CurrentUser::Known(envelope)) if envelope.success => match envelope.data {
                Some(user) => self.enter_authenticated(user),
                None => self.enter_anonymous(),
            },
            Ok(_) => self.enter_anonymous(),
            Err(e) => {
                tracing::debug!(error = %e, "session check failed, treating as anonymous");
                self.enter_anonymous();
            }
        }

        guard.checked = true;
    }

    /// Attempt a login. On success the session becomes `Authenticated` and
    /// the startup guard resets.
    pub async fn login(&self, credentials: &serde_json::Value) -> SessionOutcome {
        let result = self.auth.login(credentials).await;
        self.complete_submission(result, "Login successful!", "Login failed").await
    }

    /// Attempt a registration. Same transitions as [`Session::login`].
    pub async fn register(&self, user_data: &serde_json::Value) -> SessionOutcome {
        let result = self.auth.register(user_data).await;
        self.complete_submission(result, "Registration successful!", "Registration failed")
            .await
    }

    /// Log out. The server call is best-effort; the local session is torn
    /// down regardless of its outcome.
    pub async fn logout(&self) {
        self.auth.logout().await;
        self.enter_anonymous();
        self.mark_unchecked().await;
        self.notifier.success("Logged out successfully");
    }

    async fn complete_submission(
        &self,
        result: Result<Option<AuthEnvelope>, ApiError>,
        ok_message: &str,
        failed_message: &str,
    ) -> SessionOutcome {
        match result {
            Ok(Some(envelope)) if envelope.success => {
                self.notifier.success(ok_message);
                if let Some(user) = envelope.data {
                    self.enter_authenticated(user);
                }
                self.mark_unchecked().await;
                SessionOutcome::ok()
            }
            // A non-success envelope, or a call superseded by a newer one:
            // no transition, no toast.
            Ok(_) => SessionOutcome::failed(failed_message),
            Err(e) => {
                let message = e.server_message().unwrap_or(failed_message).to_owned();
                self.notifier.error(&message);
                SessionOutcome::failed(message)
            }
        }
    }

    fn enter_authenticated(&self, mut user: UserRecord) {
        if let Some(email) = user.email.take() {
            user.email = Some(resolve_email(&self.encryption_key, email));
        }
        {
            let mut state = self.lock_state();
            state.phase = SessionPhase::Authenticated;
            state.user = Some(user);
        }
        self.publish();
    }

    fn enter_anonymous(&self) {
        {
            let mut state = self.lock_state();
            state.phase = SessionPhase::Anonymous;
            state.user = None;
        }
        self.publish();
    }

    async fn mark_unchecked(&self) {
        self.check.lock().await.checked = false;
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        self.tx.send_replace(snapshot);
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn snapshot_of(state: &SessionState) -> SessionSnapshot {
    SessionSnapshot {
        user: state.user.clone(),
        authenticated: state.phase == SessionPhase::Authenticated,
        loading: state.phase == SessionPhase::Unknown,
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

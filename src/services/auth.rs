//! Auth operations — register, login, logout, current-user.
//!
//! CANCELLATION
//! ============
//! Register and login share one cancellation slot: only one credential
//! submission may be in flight across the whole app. Issuing a new call
//! aborts the previous one first; the superseded call settles as
//! `Ok(None)` and its outcome is never observed — this guards the
//! out-of-order-response race, not just wasted work.

use std::sync::{Arc, Mutex};

use futures::future::AbortHandle;

use crate::net::api::{ApiClient, ApiError};
use crate::net::types::AuthEnvelope;

/// Outcome of the session check against `/auth/me`.
#[derive(Clone, Debug)]
pub enum CurrentUser {
    /// The server answered; the envelope says whether a session exists.
    Known(AuthEnvelope),
    /// 401 — a normal "not logged in" outcome, not a failure.
    Anonymous,
}

/// Auth operations bound to the shared API client.
pub struct AuthService {
    api: Arc<ApiClient>,
    /// Single slot for the in-flight register/login call.
    slot: Mutex<Option<AbortHandle>>,
}

impl AuthService {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api, slot: Mutex::new(None) }
    }

    /// `POST /auth/register`. `Ok(None)` means this call was superseded.
    pub async fn register(&self, user_data: &serde_json::Value) -> Result<Option<AuthEnvelope>, ApiError> {
        self.submit("/auth/register", user_data).await
    }

    /// `POST /auth/login`. `Ok(None)` means this call was superseded.
    pub async fn login(&self, credentials: &serde_json::Value) -> Result<Option<AuthEnvelope>, ApiError> {
        self.submit("/auth/login", credentials).await
    }

    /// `POST /auth/logout`, then wipe the response cache. Best-effort:
    /// failures are logged and swallowed — the caller tears the local
    /// session down regardless.
    pub async fn logout(&self) {
        match self.api.post("/auth/logout", &serde_json::Value::Null).await {
            Ok(_) => self.api.clear_cache(),
            Err(e) => tracing::warn!(error = %e, "logout request failed"),
        }
    }

    /// `GET /auth/me`. A 401 maps to [`CurrentUser::Anonymous`]; any
    /// other failure propagates.
    pub async fn current_user(&self) -> Result<CurrentUser, ApiError> {
        match self.api.get("/auth/me", &[]).await {
            Ok(data) => Ok(CurrentUser::Known(parse_envelope(data))),
            Err(e) if e.is_unauthorized() => Ok(CurrentUser::Anonymous),
            Err(e) => Err(e),
        }
    }

    async fn submit(&self, path: &str, body: &serde_json::Value) -> Result<Option<AuthEnvelope>, ApiError> {
        let (handle, registration) = AbortHandle::new_pair();
        let previous = self
            .slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }

        match self.api.post_abortable(path, body, registration).await? {
            Some(data) => Ok(Some(parse_envelope(data))),
            None => {
                tracing::debug!(%path, "auth request superseded by a newer call");
                Ok(None)
            }
        }
    }
}

fn parse_envelope(data: serde_json::Value) -> AuthEnvelope {
    // All envelope fields default, so any JSON object parses; a non-object
    // body reads as a failed envelope rather than an error.
    serde_json::from_value(data).unwrap_or_default()
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;

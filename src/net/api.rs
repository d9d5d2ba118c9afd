//! Credentialed API client — the single place requests leave the app.
//!
//! INTERCEPTORS
//! ============
//! Request path: in development mode, GETs get a `_t` cache-busting param.
//! Response path: successful GET bodies are written to the
//! [`RequestCache`]; failures have a message extracted and surfaced
//! through the [`Notifier`] chokepoint — except 401, which the session
//! machine handles silently.
//!
//! The underlying client keeps a cookie store so the HTTP-only session
//! credential rides on every request.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use futures::future::{AbortRegistration, Abortable};
use reqwest::{Method, StatusCode};
use serde::Deserialize;

use crate::config::{Config, RuntimeMode};
use crate::net::cache::{RequestCache, cache_key};
use crate::notify::Notifier;

/// Fallback shown when a failure carries no server message.
pub const GENERIC_FAILURE: &str = "Something went wrong";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server answered with a non-success status.
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    /// The request never produced a usable response.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    /// True for the "not logged in" status the session machine absorbs.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401, .. })
    }

    /// The server-supplied failure message, if any.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => Some(message),
            Self::Transport(_) => None,
        }
    }
}

/// Error payload shape used by the backend.
#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client bound to the backend base URL.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    dev_cache_bust: bool,
    cache: RequestCache,
    notifier: Arc<dyn Notifier>,
}

impl ApiClient {
    /// Build a client from configuration. The cookie store is what makes
    /// the session credential stick across calls.
    pub fn new(config: &Config, notifier: Arc<dyn Notifier>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            dev_cache_bust: config.runtime_mode == RuntimeMode::Development,
            cache: RequestCache::new(),
            notifier,
        })
    }

    /// GET with query params. Successful bodies are cached under
    /// path + serialized params.
    pub async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<serde_json::Value, ApiError> {
        let mut query = params.to_vec();
        if self.dev_cache_bust {
            query.push(("_t", unix_millis().to_string()));
        }
        let key = cache_key(path, &query);
        let request = self.http.get(self.url(path)).query(&query);
        let data = self.execute(request).await?;
        self.cache.insert(key, data.clone());
        Ok(data)
    }

    pub async fn post(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value, ApiError> {
        self.execute(self.request_with_body(Method::POST, path, body)).await
    }

    /// POST bound to an abort registration. Aborting resolves to
    /// `Ok(None)` — supersession is not a failure.
    pub async fn post_abortable(
        &self,
        path: &str,
        body: &serde_json::Value,
        registration: AbortRegistration,
    ) -> Result<Option<serde_json::Value>, ApiError> {
        let request = self.request_with_body(Method::POST, path, body);
        match Abortable::new(self.execute(request), registration).await {
            Ok(result) => result.map(Some),
            Err(_aborted) => Ok(None),
        }
    }

    pub async fn put(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value, ApiError> {
        self.execute(self.request_with_body(Method::PUT, path, body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<serde_json::Value, ApiError> {
        self.execute(self.http.delete(self.url(path))).await
    }

    /// Wipe the response cache atomically.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Handle on the shared cache, for inspection.
    #[must_use]
    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn request_with_body(&self, method: Method, path: &str, body: &serde_json::Value) -> reqwest::RequestBuilder {
        let request = self.http.request(method, self.url(path));
        if body.is_null() { request } else { request.json(body) }
    }

    /// Single response chokepoint: parse success bodies, map failures to
    /// a message and notify — unless the status is 401.
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<serde_json::Value, ApiError> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Err(self.transport_failure(e)),
        };

        let status = response.status();
        if status.is_success() {
            return response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| self.transport_failure(e));
        }

        let message = response
            .json::<MessageBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| GENERIC_FAILURE.to_owned());
        if status != StatusCode::UNAUTHORIZED {
            self.notifier.error(&message);
        }
        Err(ApiError::Status { status: status.as_u16(), message })
    }

    fn transport_failure(&self, e: reqwest::Error) -> ApiError {
        tracing::warn!(error = %e, "request transport failure");
        self.notifier.error(GENERIC_FAILURE);
        ApiError::Transport(e)
    }
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;

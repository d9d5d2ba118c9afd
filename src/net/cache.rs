//! Write-only cache of successful GET responses.
//!
//! DESIGN
//! ======
//! Entries are advisory: nothing reads them back in this slice, but logout
//! must be able to wipe them as a unit, so they have to exist. Writes come
//! only from the response path in [`crate::net::api`]; the only other
//! mutation is a full [`RequestCache::clear`]. There is no partial
//! invalidation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// A cached response body with its arrival time.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub data: serde_json::Value,
    pub stored_at: Instant,
}

/// Process-wide response cache. Clones share the same store.
#[derive(Clone, Debug, Default)]
pub struct RequestCache {
    inner: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl RequestCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a response body under `key`, overwriting any previous entry.
    pub fn insert(&self, key: String, data: serde_json::Value) {
        self.insert_at(key, data, Instant::now());
    }

    fn insert_at(&self, key: String, data: serde_json::Value, now: Instant) {
        self.lock().insert(key, CacheEntry { data, stored_at: now });
    }

    /// Wipe every entry. Called once, on successful logout.
    pub fn clear(&self) {
        self.lock().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of one entry's body, for inspection.
    #[must_use]
    pub fn get_data(&self, key: &str) -> Option<serde_json::Value> {
        self.lock().get(key).map(|entry| entry.data.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Cache key for a request: path plus the serialized query params, in the
/// order they were sent.
#[must_use]
pub fn cache_key(path: &str, params: &[(&str, String)]) -> String {
    if params.is_empty() {
        return path.to_owned();
    }
    let query = params
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{path}?{query}")
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;

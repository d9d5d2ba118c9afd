//! Task CRUD over the shared API client.
//!
//! Bodies stay as JSON values: the backend's task and pagination envelopes
//! belong to the UI collaborators, not this layer. What this layer owns is
//! the endpoint shapes and the filter/pagination query serialization.

use std::sync::Arc;

use crate::net::api::{ApiClient, ApiError};

/// Filter and pagination parameters for the task list.
#[derive(Clone, Debug, Default)]
pub struct TaskQuery {
    /// Status filter, e.g. `"pending"` or `"completed"`. Empty means all.
    pub status: Option<String>,
    /// Free-text search over title/description.
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl TaskQuery {
    /// Serialize to query params, skipping unset fields. Order is fixed so
    /// equal queries produce equal cache keys.
    #[must_use]
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(status) = self.status.as_ref().filter(|s| !s.is_empty()) {
            params.push(("status", status.clone()));
        }
        if let Some(search) = self.search.as_ref().filter(|s| !s.is_empty()) {
            params.push(("search", search.clone()));
        }
        params
    }
}

/// Task operations bound to the shared API client.
pub struct TaskService {
    api: Arc<ApiClient>,
}

impl TaskService {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// `GET /tasks` with filters and pagination.
    pub async fn list(&self, query: &TaskQuery) -> Result<serde_json::Value, ApiError> {
        self.api.get("/tasks", &query.to_params()).await
    }

    /// `POST /tasks`.
    pub async fn create(&self, task: &serde_json::Value) -> Result<serde_json::Value, ApiError> {
        self.api.post("/tasks", task).await
    }

    /// `PUT /tasks/{id}` — full or partial update (e.g. status toggle).
    pub async fn update(&self, id: &str, task: &serde_json::Value) -> Result<serde_json::Value, ApiError> {
        self.api.put(&format!("/tasks/{id}"), task).await
    }

    /// `DELETE /tasks/{id}`.
    pub async fn delete(&self, id: &str) -> Result<serde_json::Value, ApiError> {
        self.api.delete(&format!("/tasks/{id}")).await
    }
}

#[cfg(test)]
#[path = "tasks_test.rs"]
mod tests;

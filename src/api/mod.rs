//! Web API module for ChatBuddy
//!
//! Provides REST API endpoints for:
//! - Registration and profile management
//! - Chatting with the assistant
//! - Health checks

pub mod chat;
pub mod health;
pub mod profiles;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use chatbuddy_core::{Assistant, ChatHistory};
use chatbuddy_store::{ProfileStore, StoreError};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::error;

pub use chat::chat_routes;
pub use health::health_routes;
pub use profiles::profiles_routes;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ProfileStore>,
    pub assistant: Assistant,
    /// Per-user conversation windows, in memory only
    histories: Arc<RwLock<HashMap<String, ChatHistory>>>,
    history_window: usize,
}

impl AppState {
    pub fn new(store: Arc<ProfileStore>, assistant: Assistant, history_window: usize) -> Self {
        Self {
            store,
            assistant,
            histories: Arc::new(RwLock::new(HashMap::new())),
            history_window,
        }
    }

    /// Snapshot of a user's conversation (empty when none yet)
    pub async fn history(&self, username: &str) -> ChatHistory {
        self.histories
            .read()
            .await
            .get(username)
            .cloned()
            .unwrap_or_else(|| ChatHistory::new(self.history_window))
    }

    pub async fn set_history(&self, username: &str, history: ChatHistory) {
        self.histories
            .write()
            .await
            .insert(username.to_string(), history);
    }

    pub async fn forget_history(&self, username: &str) {
        self.histories.write().await.remove(username);
    }

    /// Run a blocking store call off the async runtime.
    pub async fn with_store<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&ProfileStore) -> chatbuddy_store::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| {
                error!(error = %e, "Store task failed");
                ApiError::internal("profile store unavailable")
            })?
            .map_err(ApiError::from)
    }
}

/// Create the API router with all endpoints
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .merge(profiles_routes())
        .merge(chat_routes())
        .merge(health_routes())
        .with_state(state)
}

/// Error body `{"error": "..."}` with a status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidUsername => Self::bad_request("Username is required"),
            StoreError::NotFound(_) => Self::not_found("User not found."),
            StoreError::UnknownField(field) => Self::bad_request(format!("Invalid field: {field}")),
            StoreError::LockTimeout { .. } => {
                error!(error = %err, "Profile store busy");
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "profile store busy, try again")
            }
            other => {
                // Details stay in the log; they may name files on disk
                error!(error = %other, "Profile store error");
                Self::internal("profile store unavailable")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Trimmed, non-empty string field
pub(crate) fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Username as sent, rejected only when blank. Usernames are exact keys.
pub(crate) fn required_username(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

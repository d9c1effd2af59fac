//! Chat endpoint
//!
//! POST /chat - Reply to a registered user's message

use super::{required, required_username, ApiError, AppState};
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    pub username: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Generation failures still answer 200 with an apology in `response`.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let (username, message) = match (
        required_username(request.username),
        required(request.message),
    ) {
        (Some(u), Some(m)) => (u, m),
        _ => return Err(ApiError::bad_request("Missing username or message")),
    };

    let user = username.clone();
    let profile = state
        .with_store(move |store| store.get(&user))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found."))?;

    let mut history = state.history(&username).await;
    debug!(username = %username, history = history.len(), "Chat request");
    let response = state
        .assistant
        .converse(&profile, &mut history, &message)
        .await;
    state.set_history(&username, history).await;

    Ok(Json(ChatResponse { response }))
}

/// Create chat routes
pub fn chat_routes() -> Router<AppState> {
    Router::new().route("/chat", post(chat))
}

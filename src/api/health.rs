//! Health check endpoint
//!
//! `/health` reports liveness plus the state of the profile data file.

use super::AppState;
use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use chatbuddy_store::LoadOutcome;
use serde::Serialize;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// `empty`, `loaded`, `corrupt` or `unavailable`
    pub store: &'static str,
    pub provider: String,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = match state.with_store(|store| store.load_all()).await {
        Ok(LoadOutcome::Empty) => "empty",
        Ok(LoadOutcome::Loaded(_)) => "loaded",
        Ok(LoadOutcome::Corrupt(_)) => "corrupt",
        Err(_) => "unavailable",
    };

    Json(HealthResponse {
        status: if matches!(store, "empty" | "loaded") {
            "healthy"
        } else {
            "degraded"
        },
        version: env!("CARGO_PKG_VERSION"),
        store,
        provider: state.assistant.provider_name().to_string(),
    })
}

/// Create health routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

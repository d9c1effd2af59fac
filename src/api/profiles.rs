//! Registration and profile endpoints
//!
//! POST   /register            - Create a profile if the username is free
//! GET    /profiles/:username  - Fetch a profile
//! PUT    /profiles/:username  - Replace a profile
//! DELETE /profiles/:username  - Remove a profile

use super::{required, required_username, ApiError, AppState};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chatbuddy_core::optional_answer;
use chatbuddy_store::Profile;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Registration body. Fields are optional here so missing ones produce a
/// 400 instead of a JSON rejection.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub name: Option<String>,
    pub education: Option<String>,
    pub business: Option<String>,
    pub interests: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub status: &'static str,
    /// `false` when the username was already taken; the stored profile is kept
    pub created: bool,
}

/// Replacement body for PUT
#[derive(Debug, Default, Deserialize)]
pub struct ProfileRequest {
    pub name: Option<String>,
    pub education: Option<String>,
    pub business: Option<String>,
    pub interests: Option<String>,
}

fn build_profile(
    name: String,
    education: Option<String>,
    business: Option<String>,
    interests: Option<String>,
) -> Profile {
    Profile {
        name,
        education: education.as_deref().and_then(optional_answer),
        business: business.as_deref().and_then(optional_answer),
        interests: interests.map(|i| i.trim().to_string()).unwrap_or_default(),
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let username = required_username(request.username)
        .ok_or_else(|| ApiError::bad_request("Username is required"))?;
    let name = required(request.name).ok_or_else(|| ApiError::bad_request("Name is required"))?;
    let profile = build_profile(name, request.education, request.business, request.interests);

    let user = username.clone();
    let created = state
        .with_store(move |store| store.register(&user, profile))
        .await?;
    if !created {
        info!(username = %username, "Registration for existing user ignored");
    }

    Ok(Json(RegisterResponse {
        status: "registered",
        created,
    }))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Profile>, ApiError> {
    state
        .with_store(move |store| store.get(&username))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User not found."))
}

pub async fn put_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(request): Json<ProfileRequest>,
) -> Result<Json<Profile>, ApiError> {
    let name = required(request.name).ok_or_else(|| ApiError::bad_request("Name is required"))?;
    let profile = build_profile(name, request.education, request.business, request.interests);

    let saved = profile.clone();
    state
        .with_store(move |store| store.upsert(&username, saved))
        .await?;
    Ok(Json(profile))
}

pub async fn delete_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = username.clone();
    let removed = state.with_store(move |store| store.delete(&user)).await?;
    if !removed {
        return Err(ApiError::not_found("User not found."));
    }
    state.forget_history(&username).await;
    Ok(Json(serde_json::json!({ "status": "deleted" })))
}

/// Create profile routes
pub fn profiles_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route(
            "/profiles/:username",
            get(get_profile).put(put_profile).delete(delete_profile),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::test_state;
    use axum::http::StatusCode;

    fn register_request(username: &str, name: &str) -> RegisterRequest {
        RegisterRequest {
            username: Some(username.to_string()),
            name: Some(name.to_string()),
            education: Some("No".to_string()),
            business: Some("Ada Analytics".to_string()),
            interests: Some("chess".to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_then_get() {
        let (state, _mock, _dir) = test_state();

        let response = register(State(state.clone()), Json(register_request("ada", "Ada")))
            .await
            .unwrap();
        assert!(response.0.created);

        let profile = get_profile(State(state), Path("ada".to_string()))
            .await
            .unwrap()
            .0;
        assert_eq!(profile.name, "Ada");
        assert_eq!(profile.education, None);
        assert_eq!(profile.business.as_deref(), Some("Ada Analytics"));
        assert_eq!(profile.interests, "chess");
    }

    #[tokio::test]
    async fn test_register_does_not_overwrite() {
        let (state, _mock, _dir) = test_state();
        let _ = register(State(state.clone()), Json(register_request("ada", "Ada")))
            .await
            .unwrap();

        let response = register(State(state.clone()), Json(register_request("ada", "Impostor")))
            .await
            .unwrap();
        assert!(!response.0.created);

        let profile = state.store.get("ada").unwrap().unwrap();
        assert_eq!(profile.name, "Ada");
    }

    #[tokio::test]
    async fn test_register_requires_username_and_name() {
        let (state, _mock, _dir) = test_state();

        let err = register(
            State(state.clone()),
            Json(RegisterRequest {
                name: Some("Ada".into()),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = register(
            State(state.clone()),
            Json(RegisterRequest {
                username: Some("ada".into()),
                name: Some("  ".into()),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(state.store.get("ada").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_username_is_stored_verbatim() {
        let (state, _mock, _dir) = test_state();

        let response = register(State(state.clone()), Json(register_request(" ada ", "Ada")))
            .await
            .unwrap();
        assert!(response.0.created);

        let profile = get_profile(State(state.clone()), Path(" ada ".to_string()))
            .await
            .unwrap()
            .0;
        assert_eq!(profile.name, "Ada");
        assert!(state.store.get("ada").unwrap().is_none());

        let err = register(State(state), Json(register_request("   ", "Ada")))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_unknown_is_404() {
        let (state, _mock, _dir) = test_state();
        let err = get_profile(State(state), Path("ghost".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_put_replaces_profile() {
        let (state, _mock, _dir) = test_state();
        let _ = register(State(state.clone()), Json(register_request("ada", "Ada")))
            .await
            .unwrap();

        let updated = put_profile(
            State(state.clone()),
            Path("ada".to_string()),
            Json(ProfileRequest {
                name: Some("Ada L.".into()),
                education: Some("Maths year 3".into()),
                business: None,
                interests: Some("engines".into()),
            }),
        )
        .await
        .unwrap()
        .0;

        assert_eq!(updated.business, None);
        assert_eq!(state.store.get("ada").unwrap().unwrap(), updated);
    }

    #[tokio::test]
    async fn test_delete() {
        let (state, _mock, _dir) = test_state();
        let _ = register(State(state.clone()), Json(register_request("ada", "Ada")))
            .await
            .unwrap();

        delete_profile(State(state.clone()), Path("ada".to_string()))
            .await
            .unwrap();
        assert!(state.store.get("ada").unwrap().is_none());

        let err = delete_profile(State(state), Path("ada".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}

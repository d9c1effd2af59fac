//! Tests for Gemini provider

use super::config::{normalize_model_name, GeminiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use super::convert::convert_messages;
use super::types::GeminiErrorDetail;
use super::GeminiProvider;
use crate::completion::CompletionRequest;
use crate::error::Error;
use crate::message::Message;
use crate::provider::LlmProvider;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[test]
fn test_config_builder() {
    let config = GeminiConfig::new("test-key")
        .with_model("models/gemini-1.5-flash")
        .with_max_tokens(4096)
        .with_timeout(Duration::from_secs(30))
        .with_max_retries(0);

    assert_eq!(config.api_key, "test-key");
    assert_eq!(config.base_url, DEFAULT_BASE_URL);
    assert_eq!(config.default_model, "gemini-1.5-flash");
    assert_eq!(config.default_max_tokens, 4096);
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.max_retries, 0);
}

#[test]
fn test_default_model() {
    let config = GeminiConfig::new("k");
    assert_eq!(config.default_model, DEFAULT_MODEL);
    assert!(super::MODELS.contains(&DEFAULT_MODEL));
}

#[test]
fn test_normalize_model_name() {
    assert_eq!(normalize_model_name("models/gemini-1.5-flash"), "gemini-1.5-flash");
    assert_eq!(normalize_model_name("gemini-1.5-flash"), "gemini-1.5-flash");
    assert_eq!(normalize_model_name("  models/x "), "x");
    assert_eq!(normalize_model_name(""), "");
}

#[test]
fn test_message_conversion() {
    let messages = vec![
        Message::system("You are helpful"),
        Message::user("Hello"),
        Message::assistant("Hi there!"),
        Message::user(""),
    ];

    let (system, converted) = convert_messages(&messages);

    let system = system.expect("system instruction");
    assert!(system.role.is_none());
    assert_eq!(system.parts[0].text.as_deref(), Some("You are helpful"));
    assert_eq!(converted.len(), 2);
    assert_eq!(converted[0].role, Some("user".to_string()));
    assert_eq!(converted[1].role, Some("model".to_string()));
}

#[test]
fn test_retry_delay_parsing() {
    let detail: GeminiErrorDetail = serde_json::from_value(json!({
        "message": "quota",
        "status": "RESOURCE_EXHAUSTED",
        "details": [{"@type": "RetryInfo", "retryDelay": "3.2s"}]
    }))
    .unwrap();
    assert_eq!(detail.retry_delay_secs(), Some(4));

    let detail: GeminiErrorDetail =
        serde_json::from_value(json!({"message": "x", "status": "y"})).unwrap();
    assert_eq!(detail.retry_delay_secs(), None);
}

#[test]
fn test_config_debug_masks_key() {
    let config = GeminiConfig::new("AIza1234567890abcdefghij");
    let debug_str = format!("{:?}", config);

    assert!(!debug_str.contains("1234567890"));
    assert!(debug_str.contains("AIza...ghij"));
}

// ----------------------------------------------------------------------------
// HTTP tests against a local stand-in for the Gemini endpoint
// ----------------------------------------------------------------------------

#[derive(Clone, Default)]
struct MockServer {
    replies: Arc<Mutex<VecDeque<(StatusCode, Value)>>>,
    seen: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
}

async fn generate(
    State(server): State<MockServer>,
    Path(action): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    server.seen.lock().unwrap().push((action, key, body));
    let (status, reply) = server
        .replies
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((StatusCode::INTERNAL_SERVER_ERROR, json!({})));
    (status, Json(reply))
}

async fn spawn_server(replies: Vec<(StatusCode, Value)>) -> (String, MockServer) {
    let server = MockServer::default();
    server.replies.lock().unwrap().extend(replies);

    let app = Router::new()
        .route("/models/:action", post(generate))
        .with_state(server.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), server)
}

fn provider(base_url: &str) -> GeminiProvider {
    GeminiProvider::new(
        GeminiConfig::new("test-key")
            .with_base_url(base_url)
            .with_retry_backoff(Duration::from_millis(10)),
    )
    .unwrap()
}

fn text_reply(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 7, "candidatesTokenCount": 3, "totalTokenCount": 10}
    })
}

#[tokio::test]
async fn test_complete_success() {
    let (url, server) = spawn_server(vec![(StatusCode::OK, text_reply("Hello Ada"))]).await;
    let provider = provider(&url);

    let request = CompletionRequest::new("models/gemini-1.5-flash")
        .with_message(Message::system("Be kind"))
        .with_message(Message::user("Hi"))
        .with_temperature(0.5);
    let response = provider.complete(request).await.unwrap();

    assert_eq!(response.content, "Hello Ada");
    assert_eq!(response.model, "gemini-1.5-flash");
    assert_eq!(response.finish_reason.as_deref(), Some("STOP"));
    assert_eq!(response.usage.unwrap().total_tokens, 10);

    let seen = server.seen.lock().unwrap();
    let (action, key, body) = &seen[0];
    assert_eq!(action, "gemini-1.5-flash:generateContent");
    assert_eq!(key.as_deref(), Some("test-key"));
    assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be kind");
    assert_eq!(body["contents"][0]["role"], "user");
    assert_eq!(body["generationConfig"]["temperature"], 0.5);
}

#[tokio::test]
async fn test_complete_uses_default_model() {
    let (url, server) = spawn_server(vec![(StatusCode::OK, text_reply("ok"))]).await;
    let provider = provider(&url);

    let response = provider
        .complete(CompletionRequest::new("").with_message(Message::user("Hi")))
        .await
        .unwrap();

    assert_eq!(response.model, DEFAULT_MODEL);
    let seen = server.seen.lock().unwrap();
    assert_eq!(seen[0].0, format!("{}:generateContent", DEFAULT_MODEL));
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let (url, server) = spawn_server(vec![
        (
            StatusCode::TOO_MANY_REQUESTS,
            json!({"error": {"code": 429, "message": "slow down", "status": "RESOURCE_EXHAUSTED"}}),
        ),
        (StatusCode::OK, text_reply("after retry")),
    ])
    .await;

    let response = provider(&url)
        .complete(CompletionRequest::new("").with_message(Message::user("Hi")))
        .await
        .unwrap();

    assert_eq!(response.content, "after retry");
    assert_eq!(server.seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_server_error_exhausts_retries() {
    let (url, server) = spawn_server(vec![]).await;

    let err = provider(&url)
        .complete(CompletionRequest::new("").with_message(Message::user("Hi")))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ServerError(_)));
    // initial attempt plus two retries
    assert_eq!(server.seen.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_auth_error_is_sanitized_and_not_retried() {
    let (url, server) = spawn_server(vec![(
        StatusCode::BAD_REQUEST,
        json!({"error": {"code": 400, "message": "API key not valid: test-key", "status": "INVALID_ARGUMENT"}}),
    )])
    .await;

    let err = provider(&url)
        .complete(CompletionRequest::new("").with_message(Message::user("Hi")))
        .await
        .unwrap_err();

    match err {
        Error::Api(msg) => {
            assert!(msg.contains("authentication"));
            assert!(!msg.contains("test-key"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    assert_eq!(server.seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_candidate_text() {
    let (url, _server) = spawn_server(vec![(
        StatusCode::OK,
        json!({"candidates": [{"finishReason": "MAX_TOKENS"}]}),
    )])
    .await;

    let response = provider(&url)
        .complete(CompletionRequest::new("").with_message(Message::user("Hi")))
        .await
        .unwrap();

    assert_eq!(response.content, "(empty response)");
    assert!(response.usage.is_none());
}

#[tokio::test]
async fn test_no_candidates_is_invalid_response() {
    let (url, _server) = spawn_server(vec![(StatusCode::OK, json!({"candidates": []}))]).await;

    let err = provider(&url)
        .complete(CompletionRequest::new("").with_message(Message::user("Hi")))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidResponse(_)));
}

#[tokio::test]
async fn test_request_without_user_content_is_rejected() {
    let provider = provider("http://127.0.0.1:9");
    let err = provider
        .complete(CompletionRequest::new("").with_message(Message::system("only system")))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Api(_)));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let provider = GeminiProvider::new(
        GeminiConfig::new("k")
            .with_base_url(format!("http://{}", addr))
            .with_max_retries(0),
    )
    .unwrap();
    let err = provider
        .complete(CompletionRequest::new("").with_message(Message::user("Hi")))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Network(_)));
}

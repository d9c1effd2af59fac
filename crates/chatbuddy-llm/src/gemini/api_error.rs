//! Non-success `generateContent` replies mapped to provider errors
//!
//! Gemini error bodies carry a canonical `status` (`PERMISSION_DENIED`,
//! `RESOURCE_EXHAUSTED`, `INTERNAL`, ...). Classification uses that code,
//! falling back to the HTTP status when the body is not an error document.
//! The free-form message is only passed on for request errors, with
//! key-shaped tokens redacted.

use super::types::{GeminiError, GeminiErrorDetail};
use crate::error::Error;
use crate::util::truncate_safe;
use tracing::warn;

const MAX_MESSAGE_BYTES: usize = 300;

/// Reason code Gemini attaches to `INVALID_ARGUMENT` for a bad key
const API_KEY_INVALID: &str = "API_KEY_INVALID";

/// What a failed call means for the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Failure {
    /// Key missing, wrong or lacking access; retrying will not help
    Auth,
    /// Rate limit or quota; retry after the hint
    Quota,
    /// Server side; retry with backoff
    Unavailable,
    /// Anything wrong with the request itself
    Request,
}

impl Failure {
    pub(crate) fn classify(http_status: u16, detail: Option<&GeminiErrorDetail>) -> Self {
        if let Some(detail) = detail {
            match detail.status.as_str() {
                "UNAUTHENTICATED" | "PERMISSION_DENIED" => return Self::Auth,
                "RESOURCE_EXHAUSTED" => return Self::Quota,
                "INTERNAL" | "UNAVAILABLE" | "DEADLINE_EXCEEDED" => return Self::Unavailable,
                "INVALID_ARGUMENT" if is_invalid_key(detail) => return Self::Auth,
                _ => {}
            }
        }
        match http_status {
            401 | 403 => Self::Auth,
            429 => Self::Quota,
            500..=599 => Self::Unavailable,
            _ => Self::Request,
        }
    }
}

/// Provider error for a non-success reply, plus the server's retry hint
pub(crate) fn api_error(http_status: u16, body: &str) -> (Error, Option<u64>) {
    let detail = serde_json::from_str::<GeminiError>(body)
        .ok()
        .map(|e| e.error);
    let failure = Failure::classify(http_status, detail.as_ref());

    warn!(
        http_status,
        status = detail.as_ref().map_or("", |d| d.status.as_str()),
        ?failure,
        "Gemini API error response"
    );

    match failure {
        Failure::Auth => (
            Error::Api("authentication failed: Gemini rejected the configured key".to_string()),
            None,
        ),
        Failure::Quota => (
            Error::RateLimit,
            detail.as_ref().and_then(GeminiErrorDetail::retry_delay_secs),
        ),
        Failure::Unavailable => (
            Error::ServerError(format!("Gemini unavailable (HTTP {})", http_status)),
            None,
        ),
        Failure::Request => {
            let message = match &detail {
                Some(d) if !d.message.is_empty() => format!("{}: {}", d.status, redact(&d.message)),
                // Raw bodies are never echoed
                _ => format!("HTTP {}", http_status),
            };
            (Error::Api(bounded(message)), None)
        }
    }
}

fn is_invalid_key(detail: &GeminiErrorDetail) -> bool {
    let by_reason = detail.details.iter().flatten().any(|d| {
        d.get("reason").and_then(|r| r.as_str()) == Some(API_KEY_INVALID)
    });
    by_reason || detail.message.starts_with("API key not valid")
}

/// Replace Google API key tokens (`AIza...`) in `message`
fn redact(message: &str) -> String {
    message
        .split(' ')
        .map(|word| if word.contains("AIza") { "[redacted]" } else { word })
        .collect::<Vec<_>>()
        .join(" ")
}

fn bounded(message: String) -> String {
    if message.len() > MAX_MESSAGE_BYTES {
        format!("{}...(truncated)", truncate_safe(&message, MAX_MESSAGE_BYTES))
    } else {
        message
    }
}

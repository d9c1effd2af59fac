//! Gemini provider implementation

use super::config::{normalize_model_name, GeminiConfig, MODELS};
use super::convert::convert_messages;
use super::api_error::api_error;
use super::types::{GeminiRequest, GeminiResponse, GenerationConfig};
use crate::completion::{CompletionRequest, CompletionResponse, TokenUsage};
use crate::error::{Error, Result};
use crate::provider::LlmProvider;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

/// Upper bound on a server-provided retry hint
const MAX_RETRY_HINT_SECS: u64 = 15;

/// Gemini provider
#[derive(Debug)]
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let config = GeminiConfig::from_env()?;
        Self::new(config)
    }

    /// Provider configuration
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Send request to Gemini API, retrying rate limits and server errors
    async fn send_request(&self, model: &str, request: &GeminiRequest) -> Result<GeminiResponse> {
        let max_retries = self.config.max_retries;
        let mut attempt = 0;

        loop {
            match self.send_request_once(model, request).await {
                Ok(resp) => return Ok(resp),
                Err((Error::RateLimit, hint)) if attempt < max_retries => {
                    let delay = match hint {
                        Some(secs) => Duration::from_secs(secs.clamp(1, MAX_RETRY_HINT_SECS)),
                        None => self.config.retry_backoff * (attempt + 1),
                    };
                    tracing::info!(
                        attempt = attempt + 1,
                        model = %model,
                        delay_ms = delay.as_millis() as u64,
                        "Gemini rate limited, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err((Error::ServerError(ref msg), _)) if attempt < max_retries => {
                    let delay = self.config.retry_backoff * (attempt + 1);
                    tracing::warn!(
                        attempt = attempt + 1,
                        model = %model,
                        delay_ms = delay.as_millis() as u64,
                        error = %msg,
                        "Gemini server error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err((e, _)) => return Err(e),
            }
            attempt += 1;
        }
    }

    /// Single attempt. On a 429 the error carries the server's retry hint.
    async fn send_request_once(
        &self,
        model: &str,
        request: &GeminiRequest,
    ) -> std::result::Result<GeminiResponse, (Error, Option<u64>)> {
        // SECURITY: the key travels in a header, never in the URL
        debug!("Sending request to Gemini model: {}", model);

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| (self.transport_error(e), None))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| (self.transport_error(e), None))?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| (Error::InvalidResponse(e.to_string()), None))
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout(self.config.timeout.as_millis() as u64)
        } else {
            Error::Network(e.to_string())
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn available_models(&self) -> Vec<String> {
        MODELS.iter().map(|s| (*s).to_string()).collect()
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let model = match normalize_model_name(&request.model) {
            "" => self.config.default_model.as_str(),
            model => model,
        };

        let (system_instruction, contents) = convert_messages(&request.messages);
        if contents.is_empty() {
            return Err(Error::Api("request has no user content".to_string()));
        }

        let gemini_request = GeminiRequest {
            contents,
            system_instruction,
            generation_config: Some(GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens.or(Some(self.config.default_max_tokens)),
                stop_sequences: request.stop.clone(),
            }),
        };

        let response = self.send_request(model, &gemini_request).await?;

        let candidate = response
            .candidates
            .first()
            .ok_or_else(|| Error::InvalidResponse("No candidates in response".to_string()))?;

        let mut content: String = candidate
            .content
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|part| part.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        if content.is_empty() {
            if candidate.finish_reason.as_deref() == Some("MAX_TOKENS") {
                tracing::warn!("Gemini response empty (MAX_TOKENS)");
            }
            content = "(empty response)".to_string();
        }

        let usage = response.usage_metadata.as_ref().map(|u| TokenUsage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count.unwrap_or(0),
            total_tokens: u.total_token_count,
        });

        Ok(CompletionResponse {
            content,
            usage,
            finish_reason: candidate.finish_reason.clone(),
            model: model.to_string(),
        })
    }
}

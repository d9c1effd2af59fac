//! Assistant - reply generation over a completion provider

use crate::conversation::{ChatHistory, Turn};
use crate::error::{GenerationError, Result};
use crate::prompt::{build_messages, DEFAULT_SYSTEM_PROMPT};
use chatbuddy_llm::util::sanitize_error_for_user;
use chatbuddy_llm::{CompletionRequest, LlmProvider};
use chatbuddy_store::Profile;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Prefix of the message shown when generation fails
pub const FALLBACK_PREFIX: &str = "Sorry, something went wrong while generating response";

/// Generates replies for a profile, optionally replaying a conversation
#[derive(Clone)]
pub struct Assistant {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    system_prompt: String,
}

impl fmt::Debug for Assistant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assistant")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Assistant {
    /// Create an assistant using the provider's default model
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            model: String::new(),
            max_tokens: None,
            temperature: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Set the model (empty = provider default)
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set max output tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set sampling temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Replace the system instruction
    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Name of the underlying provider
    #[must_use]
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Model requests are sent to
    #[must_use]
    pub fn model(&self) -> &str {
        if self.model.is_empty() {
            self.provider.default_model()
        } else {
            &self.model
        }
    }

    /// Ask the provider for a reply to `message` from the user described by `profile`.
    pub async fn generate(
        &self,
        profile: &Profile,
        history: &ChatHistory,
        message: &str,
    ) -> Result<String> {
        let message = message.trim();
        if message.is_empty() {
            return Err(GenerationError::EmptyMessage);
        }

        let mut request = CompletionRequest::new(self.model.clone()).with_messages(build_messages(
            &self.system_prompt,
            history,
            profile,
            message,
        ));
        request.max_tokens = self.max_tokens;
        request.temperature = self.temperature;

        debug!(
            provider = %self.provider.name(),
            history = history.len(),
            "Requesting completion"
        );
        let response = self.provider.complete(request).await?;
        Ok(response.content.trim().to_string())
    }

    /// Like [`generate`](Self::generate), but never fails: errors become a
    /// user-facing apology.
    pub async fn reply(&self, profile: &Profile, history: &ChatHistory, message: &str) -> String {
        match self.generate(profile, history, message).await {
            Ok(text) => text,
            Err(e) => {
                log_failure(&e);
                fallback_message(&e)
            }
        }
    }

    /// Reply and record the turn in `history`.
    ///
    /// Failed turns are not recorded so the apology never becomes context.
    pub async fn converse(
        &self,
        profile: &Profile,
        history: &mut ChatHistory,
        message: &str,
    ) -> String {
        match self.generate(profile, history, message).await {
            Ok(text) => {
                history.push(Turn::new(message.trim(), text.clone()));
                text
            }
            Err(e) => {
                log_failure(&e);
                fallback_message(&e)
            }
        }
    }
}

fn log_failure(error: &GenerationError) {
    let transient = matches!(error, GenerationError::Llm(inner) if inner.is_transient());
    warn!(error = %error, transient, "Reply generation failed");
}

/// Text shown to the user in place of a reply
#[must_use]
pub fn fallback_message(error: &GenerationError) -> String {
    format!(
        "{}: {}",
        FALLBACK_PREFIX,
        sanitize_error_for_user(&error.to_string())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatbuddy_llm::{Error as LlmError, MessageRole, MockProvider};

    fn assistant(mock: &MockProvider) -> Assistant {
        Assistant::new(Arc::new(mock.clone()))
    }

    #[tokio::test]
    async fn test_generate_sends_profile_prompt() {
        let mock = MockProvider::new();
        mock.add_response("  Try Sicilian defence.  ");
        let profile = Profile::new("Ada", "chess");

        let reply = assistant(&mock)
            .with_temperature(0.3)
            .with_max_tokens(256)
            .generate(&profile, &ChatHistory::default(), "opening tips?")
            .await
            .unwrap();

        assert_eq!(reply, "Try Sicilian defence.");
        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.temperature, Some(0.3));
        assert_eq!(request.max_tokens, Some(256));
        assert_eq!(request.messages[0].role, MessageRole::System);
        assert_eq!(
            request.messages[1].content,
            "This user is named Ada, and is interested in chess\nUser asked: opening tips?"
        );
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let mock = MockProvider::new();
        let err = assistant(&mock)
            .generate(&Profile::new("Ada", ""), &ChatHistory::default(), "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::EmptyMessage));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_reply_falls_back_on_error() {
        let mock = MockProvider::new();
        mock.add_error(LlmError::Network("connection refused".to_string()));

        let reply = assistant(&mock)
            .reply(&Profile::new("Ada", ""), &ChatHistory::default(), "hi")
            .await;

        assert!(reply.starts_with(FALLBACK_PREFIX));
        assert!(reply.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_fallback_hides_credentials() {
        let mock = MockProvider::new();
        mock.add_error(LlmError::Api("bad api_key AIza123".to_string()));

        let reply = assistant(&mock)
            .reply(&Profile::new("Ada", ""), &ChatHistory::default(), "hi")
            .await;

        assert!(reply.starts_with(FALLBACK_PREFIX));
        assert!(!reply.contains("AIza123"));
    }

    #[tokio::test]
    async fn test_converse_records_successful_turns_only() {
        let mock = MockProvider::new();
        mock.add_response("first answer");
        mock.add_error(LlmError::RateLimit);
        mock.add_response("third answer");
        let assistant = assistant(&mock);
        let profile = Profile::new("Ada", "chess");
        let mut history = ChatHistory::new(4);

        assert_eq!(assistant.converse(&profile, &mut history, "q1").await, "first answer");
        let failed = assistant.converse(&profile, &mut history, "q2").await;
        assert!(failed.starts_with(FALLBACK_PREFIX));
        assistant.converse(&profile, &mut history, "q3").await;

        assert_eq!(history.len(), 2);
        let requests = mock.requests();
        // third request replays only the successful first turn
        assert_eq!(requests[2].messages.len(), 4);
        assert_eq!(requests[2].messages[1].content, "q1");
        assert_eq!(requests[2].messages[2].content, "first answer");
    }

    #[test]
    fn test_generate_blocking() {
        let mock = MockProvider::new();
        mock.add_response("ok");
        let reply = tokio_test::block_on(assistant(&mock).generate(
            &Profile::new("Ada", ""),
            &ChatHistory::default(),
            "hi",
        ))
        .unwrap();
        assert_eq!(reply, "ok");
    }

    #[test]
    fn test_model_defaults_to_provider() {
        let mock = MockProvider::new();
        assert_eq!(assistant(&mock).model(), "mock-model");
        assert_eq!(assistant(&mock).with_model("gemini-x").model(), "gemini-x");
        assert_eq!(assistant(&mock).provider_name(), "mock");
    }
}

//! LLM provider resolution

use super::config::{AppConfig, LlmSettings};
use anyhow::{bail, Context, Result};
use chatbuddy_core::Assistant;
use chatbuddy_llm::util::mask_api_key;
use chatbuddy_llm::{GeminiConfig, GeminiProvider, LlmProvider, MockProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Build the provider named in `[llm] provider`
pub fn resolve_llm_provider(settings: &LlmSettings) -> Result<Arc<dyn LlmProvider>> {
    match settings.provider.trim().to_lowercase().as_str() {
        "gemini" | "google" => {
            let config = GeminiConfig::from_env()
                .context("Gemini provider selected but no API key is configured")?
                .with_model(settings.model.as_str())
                .with_max_tokens(settings.max_tokens)
                .with_timeout(Duration::from_secs(settings.timeout_secs))
                .with_max_retries(settings.max_retries);
            info!(
                model = %config.default_model,
                api_key = %mask_api_key(&config.api_key),
                "Using Gemini provider"
            );
            let provider =
                GeminiProvider::new(config).context("Failed to create Gemini provider")?;
            Ok(Arc::new(provider))
        }
        "mock" => {
            warn!("Using mock LLM provider; replies are canned");
            Ok(Arc::new(MockProvider::new()))
        }
        other => bail!("Unknown LLM provider '{}' (expected gemini or mock)", other),
    }
}

/// Assistant configured from `[llm]` and `[chat]`
pub fn build_assistant(config: &AppConfig, provider: Arc<dyn LlmProvider>) -> Assistant {
    let assistant = Assistant::new(provider)
        .with_model(config.llm.model.as_str())
        .with_max_tokens(config.llm.max_tokens)
        .with_temperature(config.llm.temperature);

    match config.chat.system_prompt.trim() {
        "" => assistant,
        prompt => assistant.with_system_prompt(prompt),
    }
}

//! Gemini - Google Gemini API provider
//!
//! This module implements the Google Gemini provider using reqwest.

mod api_error;
mod config;
mod convert;
mod provider;
mod types;

#[cfg(test)]
mod tests;

// Re-export public API
pub use config::{normalize_model_name, GeminiConfig, DEFAULT_MODEL, MODELS};
pub use provider::GeminiProvider;

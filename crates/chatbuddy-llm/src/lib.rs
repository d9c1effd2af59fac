//! ChatBuddy LLM - Completion service abstraction
//!
//! This crate provides the text-completion seam used by ChatBuddy:
//! - Provider: `LlmProvider` trait shared by every backend
//! - Gemini: Google Gemini provider over the REST API
//! - Mock: scripted provider for tests and offline runs

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod error;
pub mod gemini;
pub mod message;
pub mod mock;
pub mod provider;
pub mod util;

pub use completion::{CompletionRequest, CompletionResponse, TokenUsage};
pub use error::{Error, Result};
pub use message::{Message, MessageRole};
pub use mock::MockProvider;
pub use provider::LlmProvider;

// Re-export provider types
pub use gemini::{GeminiConfig, GeminiProvider};

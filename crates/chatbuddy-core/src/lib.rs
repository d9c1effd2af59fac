//! ChatBuddy Core - Conversation Engine
//!
//! This crate turns a stored profile and a user message into a reply:
//! - Prompt: profile-aware prompt composition
//! - Conversation: bounded per-user chat history
//! - Assistant: completion calls with a user-facing fallback
//! - Onboarding: questionnaire that builds a new profile

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod assistant;
pub mod conversation;
pub mod error;
pub mod onboarding;
pub mod prompt;

pub use assistant::{fallback_message, Assistant, FALLBACK_PREFIX};
pub use conversation::{ChatHistory, Turn, DEFAULT_HISTORY_WINDOW};
pub use error::{GenerationError, Result};
pub use onboarding::{is_declined, optional_answer, Onboarding, Question, QUESTIONS};
pub use prompt::{build_messages, compose_prompt, profile_intro, DEFAULT_SYSTEM_PROMPT};

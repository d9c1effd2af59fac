//! Error types for chatbuddy-core

use thiserror::Error;

/// Failure to produce a reply
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The user message was empty after trimming
    #[error("message is empty")]
    EmptyMessage,

    /// The completion service failed
    #[error("llm error: {0}")]
    Llm(#[from] chatbuddy_llm::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, GenerationError>;

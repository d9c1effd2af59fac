//! Message conversion for the Gemini API

use super::types::{GeminiContent, GeminiPart};
use crate::message::{Message, MessageRole};

/// Convert messages to Gemini format, returning system instruction separately.
///
/// Multiple system messages are joined into one instruction. Empty turns are
/// dropped since Gemini rejects contents without parts.
pub(crate) fn convert_messages(messages: &[Message]) -> (Option<GeminiContent>, Vec<GeminiContent>) {
    let mut system_parts = Vec::new();
    let mut contents = Vec::new();

    for msg in messages {
        if msg.content.is_empty() {
            continue;
        }
        match msg.role {
            MessageRole::System => system_parts.push(GeminiPart::text(msg.content.clone())),
            MessageRole::User => contents.push(GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart::text(msg.content.clone())],
            }),
            MessageRole::Assistant => contents.push(GeminiContent {
                role: Some("model".to_string()),
                parts: vec![GeminiPart::text(msg.content.clone())],
            }),
        }
    }

    let system_instruction = if system_parts.is_empty() {
        None
    } else {
        Some(GeminiContent {
            role: None,
            parts: system_parts,
        })
    };

    (system_instruction, contents)
}

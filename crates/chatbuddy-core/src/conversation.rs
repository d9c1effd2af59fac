//! Bounded conversation history
//!
//! Only the most recent turns are replayed to the completion service. Older
//! turns fall off the front once the window is full.

use chatbuddy_llm::Message;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of turns replayed with each request
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// One exchange: what the user typed and what the assistant answered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Raw user message (without the profile intro)
    pub user: String,
    /// Assistant reply
    pub bot: String,
}

impl Turn {
    /// Create a turn
    #[must_use]
    pub fn new(user: impl Into<String>, bot: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            bot: bot.into(),
        }
    }
}

/// Sliding window of recent turns, oldest first
#[derive(Debug, Clone)]
pub struct ChatHistory {
    turns: VecDeque<Turn>,
    window: usize,
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_WINDOW)
    }
}

impl ChatHistory {
    /// Create an empty history keeping at most `window` turns.
    ///
    /// A window of zero keeps nothing; every request is then stateless.
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(window.min(64)),
            window,
        }
    }

    /// Record a finished turn, evicting the oldest when full
    pub fn push(&mut self, turn: Turn) {
        if self.window == 0 {
            return;
        }
        while self.turns.len() >= self.window {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    /// Forget every turn
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Turns oldest first
    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    /// Number of stored turns
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether no turn is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Maximum number of turns kept
    #[must_use]
    pub fn window(&self) -> usize {
        self.window
    }

    /// Replay the window as alternating user/assistant messages
    #[must_use]
    pub fn to_messages(&self) -> Vec<Message> {
        self.turns
            .iter()
            .flat_map(|t| [Message::user(t.user.clone()), Message::assistant(t.bot.clone())])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatbuddy_llm::MessageRole;

    #[test]
    fn test_window_evicts_oldest() {
        let mut history = ChatHistory::new(2);
        history.push(Turn::new("one", "1"));
        history.push(Turn::new("two", "2"));
        history.push(Turn::new("three", "3"));

        assert_eq!(history.len(), 2);
        let users: Vec<_> = history.turns().map(|t| t.user.as_str()).collect();
        assert_eq!(users, vec!["two", "three"]);
    }

    #[test]
    fn test_zero_window_keeps_nothing() {
        let mut history = ChatHistory::new(0);
        history.push(Turn::new("hi", "hello"));
        assert!(history.is_empty());
        assert!(history.to_messages().is_empty());
    }

    #[test]
    fn test_to_messages_alternates_roles() {
        let mut history = ChatHistory::default();
        history.push(Turn::new("q1", "a1"));
        history.push(Turn::new("q2", "a2"));

        let messages = history.to_messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[0].content, "q1");
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(messages[3].content, "a2");
    }

    #[test]
    fn test_clear() {
        let mut history = ChatHistory::new(3);
        history.push(Turn::new("q", "a"));
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.window(), 3);
    }

    #[test]
    fn test_turn_serialization() {
        let turn = Turn::new("hi", "hello");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json, serde_json::json!({"user": "hi", "bot": "hello"}));
    }
}

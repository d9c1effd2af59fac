//! Profile-aware prompt composition

use crate::conversation::ChatHistory;
use chatbuddy_llm::Message;
use chatbuddy_store::Profile;

/// System instruction sent with every request
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly and intelligent assistant. \
Keep your answers relevant and avoid repeating details unless asked.";

/// Name used when a profile has an empty name
const ANONYMOUS: &str = "Anonymous";

/// One-sentence description of the user, e.g.
/// `This user is named Ada, studying CS year 2, and is interested in chess`.
///
/// Unset optional fields and empty interests are left out.
#[must_use]
pub fn profile_intro(profile: &Profile) -> String {
    let name = match profile.name.trim() {
        "" => ANONYMOUS,
        name => name,
    };

    let mut intro = format!("This user is named {name}");
    if let Some(education) = &profile.education {
        intro.push_str(&format!(", studying {education}"));
    }
    if let Some(business) = &profile.business {
        intro.push_str(&format!(", runs a business called {business}"));
    }
    if !profile.interests.trim().is_empty() {
        intro.push_str(&format!(", and is interested in {}", profile.interests));
    }
    intro
}

/// Intro followed by the user's message
#[must_use]
pub fn compose_prompt(profile: &Profile, message: &str) -> String {
    format!("{}\nUser asked: {}", profile_intro(profile), message)
}

/// Full message list: system instruction, replayed history, current prompt
#[must_use]
pub fn build_messages(
    system_prompt: &str,
    history: &ChatHistory,
    profile: &Profile,
    message: &str,
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() * 2 + 2);
    if !system_prompt.is_empty() {
        messages.push(Message::system(system_prompt));
    }
    messages.extend(history.to_messages());
    messages.push(Message::user(compose_prompt(profile, message)));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Turn;
    use chatbuddy_llm::MessageRole;

    #[test]
    fn test_intro_full_profile() {
        let profile = Profile::new("Ada", "chess")
            .with_education("CS year 2")
            .with_business("Ada Analytics");

        assert_eq!(
            profile_intro(&profile),
            "This user is named Ada, studying CS year 2, runs a business called Ada Analytics, \
             and is interested in chess"
        );
    }

    #[test]
    fn test_intro_skips_absent_fields() {
        let profile = Profile::new("Bob", "");
        assert_eq!(profile_intro(&profile), "This user is named Bob");

        let profile = Profile::new("Bob", "go").with_business("Bob's Bikes");
        assert_eq!(
            profile_intro(&profile),
            "This user is named Bob, runs a business called Bob's Bikes, and is interested in go"
        );
    }

    #[test]
    fn test_intro_empty_name_is_anonymous() {
        let profile = Profile::new("  ", "");
        assert_eq!(profile_intro(&profile), "This user is named Anonymous");
    }

    #[test]
    fn test_compose_prompt() {
        let profile = Profile::new("Ada", "chess");
        assert_eq!(
            compose_prompt(&profile, "What should I read?"),
            "This user is named Ada, and is interested in chess\nUser asked: What should I read?"
        );
    }

    #[test]
    fn test_build_messages_order() {
        let mut history = ChatHistory::new(5);
        history.push(Turn::new("earlier", "reply"));
        let profile = Profile::new("Ada", "chess");

        let messages = build_messages(DEFAULT_SYSTEM_PROMPT, &history, &profile, "now");

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[1].content, "earlier");
        assert_eq!(messages[2].role, MessageRole::Assistant);
        assert_eq!(messages[3].role, MessageRole::User);
        assert!(messages[3].content.ends_with("User asked: now"));
    }

    #[test]
    fn test_build_messages_without_system_prompt() {
        let messages = build_messages("", &ChatHistory::default(), &Profile::new("A", ""), "x");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, MessageRole::User);
    }
}

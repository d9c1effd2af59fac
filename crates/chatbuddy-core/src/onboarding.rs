//! Onboarding questionnaire for new users
//!
//! The front-end supplies the I/O (terminal, form, ...); this module owns
//! the questions and how answers map onto a [`Profile`].

use chatbuddy_store::{Profile, ProfileField};

/// A question asked while building a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Question {
    /// Field the answer fills
    pub field: ProfileField,
    /// Text shown to the user
    pub prompt: &'static str,
    /// Short label for line-oriented input
    pub label: &'static str,
    /// Declining leaves the field unset
    pub optional: bool,
}

/// Questions in the order they are asked
pub const QUESTIONS: [Question; 4] = [
    Question {
        field: ProfileField::Name,
        prompt: "What's your full name?",
        label: "Name",
        optional: false,
    },
    Question {
        field: ProfileField::Education,
        prompt: "Are you a student? If yes, mention your course and year. Otherwise say 'No'.",
        label: "Education",
        optional: true,
    },
    Question {
        field: ProfileField::Business,
        prompt: "Do you have a business? If yes, mention the name. Otherwise say 'No'.",
        label: "Business",
        optional: true,
    },
    Question {
        field: ProfileField::Interests,
        prompt: "What are your interests?",
        label: "Interests",
        optional: false,
    },
];

const DECLINES: &[&str] = &["", "no", "n", "none", "nope", "n/a", "na", "-"];

/// Whether an answer to an optional question means "not applicable".
///
/// Matches whole answers only, so "Nottingham Uni" or "Economics" count as
/// real answers.
#[must_use]
pub fn is_declined(answer: &str) -> bool {
    let normalized = answer.trim().trim_end_matches(&['.', '!'][..]).to_lowercase();
    DECLINES.contains(&normalized.as_str())
}

/// Trimmed answer, or `None` when declined
#[must_use]
pub fn optional_answer(answer: &str) -> Option<String> {
    if is_declined(answer) {
        None
    } else {
        Some(answer.trim().to_string())
    }
}

/// Drives the questionnaire through a caller-provided `ask` function
#[derive(Debug, Default, Clone, Copy)]
pub struct Onboarding;

impl Onboarding {
    /// Ask every question and assemble the profile.
    ///
    /// `ask` receives each question and returns the raw answer; its error
    /// aborts the questionnaire.
    pub fn run<E, F>(mut ask: F) -> Result<Profile, E>
    where
        F: FnMut(&Question) -> Result<String, E>,
    {
        let mut profile = Profile::default();
        for question in &QUESTIONS {
            let answer = ask(question)?;
            profile = Self::apply(profile, question, &answer);
        }
        Ok(profile)
    }

    /// Fold one answer into the profile
    #[must_use]
    pub fn apply(profile: Profile, question: &Question, answer: &str) -> Profile {
        if question.optional {
            match optional_answer(answer) {
                Some(value) => profile.with_field(question.field, value),
                None => profile,
            }
        } else {
            profile.with_field(question.field, answer.trim())
        }
    }
}

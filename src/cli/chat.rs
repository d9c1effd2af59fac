//! `chatbuddy chat` - interactive terminal session
//!
//! Logs the user in (running the onboarding questionnaire for new
//! usernames), then loops over lines of input:
//! - `exit` ends the session
//! - `/reset` re-asks every profile question and clears the conversation
//! - `/update` changes a single profile field
//! - anything else is sent to the assistant

use crate::server::{
    build_assistant, load_config, open_store, report_store_state, resolve_llm_provider,
};
use anyhow::{Context, Result};
use chatbuddy_core::{Assistant, ChatHistory, Onboarding, Question};
use chatbuddy_store::{Profile, ProfileField, ProfileStore};
use std::io::{self, BufRead, Write};
use tracing::warn;

pub async fn run(username: Option<String>) -> Result<()> {
    let config = load_config()?;
    let store = open_store(&config)?;
    report_store_state(&store);
    let provider = resolve_llm_provider(&config.llm)?;
    let assistant = build_assistant(&config, provider);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut session = ChatSession::new(
        &store,
        &assistant,
        config.chat.history_window,
        stdin.lock(),
        stdout.lock(),
    );
    session.run(username).await
}

/// One terminal conversation over arbitrary input/output streams
pub struct ChatSession<'a, R, W> {
    store: &'a ProfileStore,
    assistant: &'a Assistant,
    history: ChatHistory,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> ChatSession<'a, R, W> {
    pub fn new(
        store: &'a ProfileStore,
        assistant: &'a Assistant,
        history_window: usize,
        input: R,
        output: W,
    ) -> Self {
        Self {
            store,
            assistant,
            history: ChatHistory::new(history_window),
            input,
            output,
        }
    }

    pub async fn run(&mut self, username: Option<String>) -> Result<()> {
        let username = match username.filter(|u| !u.trim().is_empty()) {
            Some(u) => u,
            None => {
                self.say("Welcome! Please enter your username to continue.")?;
                match self.ask_username()? {
                    Some(u) => u,
                    None => return Ok(()),
                }
            }
        };

        let mut profile = match self.store.get(&username).context("Failed to read profile")? {
            Some(profile) => {
                self.say(&format!("Welcome back, {}!", profile.name))?;
                profile
            }
            None => {
                let Some(profile) = self.onboard()? else {
                    return Ok(());
                };
                if !self.store.register(&username, profile.clone())? {
                    // registered concurrently from elsewhere; keep what is stored
                    self.store.get(&username)?.unwrap_or(profile)
                } else {
                    profile
                }
            }
        };

        self.say(
            "I'm ready to chat. Type 'exit' to quit, '/reset' to clear, or '/update' to change your info.",
        )?;

        loop {
            let Some(line) = self.prompt("You")? else {
                break;
            };
            let input = line.trim();

            match input.to_lowercase().as_str() {
                "" => continue,
                "exit" => {
                    self.say("Goodbye!")?;
                    break;
                }
                "/reset" => match self.reset(&username) {
                    Ok(Some(updated)) => profile = updated,
                    Ok(None) => break,
                    Err(e) => self.report(&e)?,
                },
                "/update" => match self.update(&username) {
                    Ok(Some(updated)) => profile = updated,
                    Ok(None) => {}
                    Err(e) => self.report(&e)?,
                },
                _ => {
                    let reply = self
                        .assistant
                        .converse(&profile, &mut self.history, input)
                        .await;
                    self.say(&reply)?;
                }
            }
        }
        Ok(())
    }

    /// Ask every onboarding question. `None` when input ends early.
    fn onboard(&mut self) -> Result<Option<Profile>> {
        let result = Onboarding::run(|question: &Question| {
            self.say(question.prompt)?;
            self.prompt(question.label)?
                .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))
        });
        match result {
            Ok(profile) => Ok(Some(profile)),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn reset(&mut self, username: &str) -> Result<Option<Profile>> {
        let Some(profile) = self.onboard()? else {
            return Ok(None);
        };
        self.store.upsert(username, profile.clone())?;
        self.history.clear();
        self.say("Your information has been reset.")?;
        Ok(Some(profile))
    }

    fn update(&mut self, username: &str) -> Result<Option<Profile>> {
        self.say("What would you like to update? name, education, business, or interests?")?;
        let Some(answer) = self.prompt("Field")? else {
            return Ok(None);
        };
        let field: ProfileField = match answer.parse() {
            Ok(field) => field,
            Err(_) => {
                self.say("Invalid field.")?;
                return Ok(None);
            }
        };
        let Some(value) = self.prompt(&format!("New value for {}", field))? else {
            return Ok(None);
        };
        let value = value.trim();
        if value.is_empty() {
            self.say("Nothing changed.")?;
            return Ok(None);
        }
        let profile = self.store.update_field(username, field, value)?;
        self.say(&format!("Updated {}.", field))?;
        Ok(Some(profile))
    }

    fn report(&mut self, error: &anyhow::Error) -> Result<()> {
        warn!(error = %error, "Chat command failed");
        self.say(&format!("Error: {}", error))?;
        Ok(())
    }

    fn say(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.output, "🤖 Bot: {}", text)
    }

    /// Print `label: ` and read one line; `None` at end of input
    fn prompt(&mut self, label: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}: ", label)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
    }

    /// Usernames are exact keys: blank lines are re-asked, others kept as typed
    fn ask_username(&mut self) -> io::Result<Option<String>> {
        loop {
            match self.prompt("Username")? {
                None => return Ok(None),
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => return Ok(Some(line)),
            }
        }
    }
}

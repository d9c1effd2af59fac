//! `chatbuddy profiles` - inspect and remove stored profiles

use super::ProfilesCommand;
use crate::server::{load_config, open_store};
use anyhow::{Context, Result};
use chatbuddy_store::ProfileStore;
use std::io::Write;

pub fn run(action: ProfilesCommand) -> Result<()> {
    let config = load_config()?;
    let store = open_store(&config)?;
    let stdout = std::io::stdout();
    execute(&store, action, &mut stdout.lock())
}

/// Run one profiles subcommand against `store`, writing to `out`
pub fn execute(store: &ProfileStore, action: ProfilesCommand, out: &mut impl Write) -> Result<()> {
    match action {
        ProfilesCommand::List => {
            let profiles = store.profiles().context("Failed to read profiles")?;
            if profiles.is_empty() {
                writeln!(out, "No profiles stored.")?;
            }
            for (username, profile) in &profiles {
                writeln!(out, "{}\t{}", username, profile.name)?;
            }
        }
        ProfilesCommand::Show { username } => match store.get(&username)? {
            Some(profile) => writeln!(out, "{}", serde_json::to_string_pretty(&profile)?)?,
            None => anyhow::bail!("No profile for '{}'", username),
        },
        ProfilesCommand::Delete { username } => {
            if store.delete(&username)? {
                writeln!(out, "Deleted '{}'.", username)?;
            } else {
                writeln!(out, "No profile for '{}'; nothing deleted.", username)?;
            }
        }
    }
    Ok(())
}

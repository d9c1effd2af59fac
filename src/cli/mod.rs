//! CLI module for ChatBuddy
//!
//! Provides commands:
//! - `chat`: Interactive terminal chat with onboarding
//! - `serve`: HTTP API server
//! - `profiles`: Inspect and remove stored profiles
//! - `doctor`: Configuration and data file diagnostics

use clap::{Parser, Subcommand};

pub mod chat;
pub mod doctor;
pub mod profiles;

/// ChatBuddy CLI
#[derive(Parser, Debug)]
#[command(name = "chatbuddy")]
#[command(about = "Profile-aware chat assistant with an encrypted local profile store")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chat in the terminal
    Chat {
        /// Log in as this user instead of being asked
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Start the HTTP server
    Serve,
    /// Manage stored profiles
    Profiles {
        #[command(subcommand)]
        action: ProfilesCommand,
    },
    /// Run diagnostics
    Doctor,
}

#[derive(Subcommand, Debug)]
pub enum ProfilesCommand {
    /// List usernames
    List,
    /// Print one profile as JSON
    Show {
        username: String,
    },
    /// Delete one profile
    Delete {
        username: String,
    },
}

impl Cli {
    /// Default log filter; interactive chat keeps the terminal quiet
    pub fn default_log_filter(&self) -> &'static str {
        match self.command {
            Some(Commands::Chat { .. }) | Some(Commands::Profiles { .. }) => {
                "chatbuddy=warn,tower_http=warn"
            }
            _ => "chatbuddy=info,tower_http=info",
        }
    }
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Chat { username }) => chat::run(username).await,
        Some(Commands::Serve) => crate::server::run().await,
        Some(Commands::Profiles { action }) => profiles::run(action),
        Some(Commands::Doctor) => doctor::run().await,
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}

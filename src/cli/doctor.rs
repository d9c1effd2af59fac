//! `chatbuddy doctor` - configuration and data file diagnostics

use crate::server::config::AppConfig;
use crate::server::load_config;
use chatbuddy_llm::util::mask_api_key;
use chatbuddy_store::{LoadOutcome, ProfileStore, StoreConfig};
use std::path::Path;

pub async fn run() -> anyhow::Result<()> {
    println!("🏥 ChatBuddy Doctor\n");

    print!("Checking configuration... ");
    let config = match load_config() {
        Ok(config) => {
            println!("✅ Loaded");
            config
        }
        Err(e) => {
            println!("❌ {:#}", e);
            std::process::exit(1);
        }
    };

    let mut all_ok = true;
    all_ok &= check_data_dir(&config);
    all_ok &= check_store(&config.store_config());
    all_ok &= check_llm_config(&config);

    println!();
    if all_ok {
        println!("✅ All checks passed! Ready to run ChatBuddy.");
    } else {
        println!("⚠️  Some checks failed. Please fix the issues above.");
        std::process::exit(1);
    }

    Ok(())
}

fn check_data_dir(config: &AppConfig) -> bool {
    print!("Checking data directory... ");
    let dir = config.data_dir();
    if dir.is_dir() {
        println!("✅ {}", dir.display());
    } else {
        println!("ℹ️  Will create {}", dir.display());
    }
    true
}

/// State of the key and data files, without creating anything
#[derive(Debug, PartialEq, Eq)]
pub enum StoreReport {
    /// No key yet; first run will create it
    NoKey,
    /// Key file exists but is not a valid key
    BadKey(String),
    /// Key present, no data file
    Empty,
    /// Key present, data file readable
    Loaded(usize),
    /// Data file present but unreadable with this key
    Corrupt(String),
}

pub fn inspect_store(config: &StoreConfig) -> StoreReport {
    if !config.key_path.exists() {
        return StoreReport::NoKey;
    }
    let store = match ProfileStore::open(config.clone()) {
        Ok(store) => store,
        Err(e) => return StoreReport::BadKey(e.to_string()),
    };
    match store.load_all() {
        Ok(LoadOutcome::Empty) => StoreReport::Empty,
        Ok(LoadOutcome::Loaded(map)) => StoreReport::Loaded(map.len()),
        Ok(LoadOutcome::Corrupt(e)) => StoreReport::Corrupt(e.to_string()),
        Err(e) => StoreReport::Corrupt(e.to_string()),
    }
}

fn check_store(config: &StoreConfig) -> bool {
    print!("Checking profile store... ");
    match inspect_store(config) {
        StoreReport::NoKey => {
            println!("ℹ️  No key yet");
            println!("  Key will be created at {}", config.key_path.display());
            if config.data_path.exists() {
                println!("  ❌ {} exists but its key is missing", display(&config.data_path));
                return false;
            }
            true
        }
        StoreReport::BadKey(reason) => {
            println!("❌ {}", reason);
            false
        }
        StoreReport::Empty => {
            println!("✅ Key found, no profiles yet");
            true
        }
        StoreReport::Loaded(count) => {
            println!("✅ {} profile(s) in {}", count, display(&config.data_path));
            true
        }
        StoreReport::Corrupt(reason) => {
            println!("❌ Data file unreadable: {}", reason);
            println!(
                "  Set store.corruption_policy = \"treat_as_empty\" to move it aside and start fresh"
            );
            false
        }
    }
}

fn check_llm_config(config: &AppConfig) -> bool {
    print!("Checking LLM provider... ");
    match config.llm.provider.as_str() {
        "mock" => {
            println!("ℹ️  Mock provider (canned replies)");
            true
        }
        _ => {
            let key = std::env::var("GOOGLE_API_KEY")
                .or_else(|_| std::env::var("GEMINI_API_KEY"))
                .unwrap_or_default();
            if key.trim().is_empty() {
                println!("❌ GOOGLE_API_KEY not set");
                println!("  Add GOOGLE_API_KEY=... to .env");
                false
            } else {
                println!("✅ Gemini {} (key {})", config.llm.model, mask_api_key(&key));
                true
            }
        }
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

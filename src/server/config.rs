//! Application configuration types
//!
//! Mirrors `config/default.toml`; every section has serde defaults so a
//! partial override file is enough.

use chatbuddy_store::{CorruptionPolicy, StoreConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory for the key and data files (empty = `~/.chatbuddy`)
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub chat: ChatSettings,
    #[serde(default)]
    pub server: ServerConfig,
}

impl AppConfig {
    /// Resolved data directory
    pub fn data_dir(&self) -> PathBuf {
        match self.data_dir.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::home_dir()
                .map(|h| h.join(".chatbuddy"))
                .unwrap_or_else(|| PathBuf::from(".chatbuddy")),
        }
    }

    /// Store configuration derived from `[store]` and `data_dir`
    pub fn store_config(&self) -> StoreConfig {
        let dir = self.data_dir();
        StoreConfig {
            key_path: dir.join(&self.store.key_file),
            data_path: dir.join(&self.store.data_file),
            ..StoreConfig::in_dir(&dir)
        }
        .with_corruption_policy(self.store.corruption_policy)
        .with_lock_timeout(Duration::from_millis(self.store.lock_timeout_ms))
        .with_lock_stale_after(Duration::from_secs(self.store.lock_stale_secs))
    }
}

/// `[store]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    pub key_file: String,
    pub data_file: String,
    pub corruption_policy: CorruptionPolicy,
    pub lock_timeout_ms: u64,
    pub lock_stale_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            key_file: chatbuddy_store::KEY_FILE.to_string(),
            data_file: chatbuddy_store::DATA_FILE.to_string(),
            corruption_policy: CorruptionPolicy::Fail,
            lock_timeout_ms: 5_000,
            lock_stale_secs: 30,
        }
    }
}

/// `[llm]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// `gemini` or `mock`
    pub provider: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_max_retries() -> u32 {
    2
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: chatbuddy_llm::gemini::DEFAULT_MODEL.to_string(),
            max_tokens: 2048,
            temperature: 0.7,
            timeout_secs: 60,
            max_retries: default_max_retries(),
        }
    }
}

/// `[chat]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    pub history_window: usize,
    /// Empty = built-in instruction
    #[serde(default)]
    pub system_prompt: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            history_window: chatbuddy_core::DEFAULT_HISTORY_WINDOW,
            system_prompt: String::new(),
        }
    }
}

/// `[server]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

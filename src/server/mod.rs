//! Server module for ChatBuddy
//!
//! Contains the main server initialization and runtime logic.
//!
//! # Module Structure
//!
//! - `config`: Configuration structures
//! - `loader`: Configuration loading from files and environment
//! - `providers`: LLM provider resolution and assistant setup
//! - `init`: Store opening, router and the run loop

pub mod config;
mod init;
mod loader;
mod providers;

// Re-export public API
pub use init::{open_store, report_store_state, run};
pub use loader::load_config;
pub use providers::{build_assistant, resolve_llm_provider};

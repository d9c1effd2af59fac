//! ChatBuddy Store - Encrypted per-user profile store
//!
//! All users' profiles live in one JSON document, encrypted at rest with
//! AES-256-GCM under a key generated on first use.
//!
//! - `key`: key file creation and loading
//! - `profile`: `Profile` record and pure map operations
//! - `atomic`: temp-file + rename replacement of the data file
//! - `lock`: cross-process writer lock file
//! - `store`: `ProfileStore`, load/save and serialized read-modify-write

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod atomic;
pub mod error;
pub mod key;
pub mod lock;
pub mod profile;
pub mod store;

pub use error::{Result, StoreError};
pub use key::load_key;
pub use lock::{FileLock, LockOptions};
pub use profile::{delete_profile, get_profile, upsert_profile, Profile, ProfileField, ProfileMap};
pub use store::{
    CorruptionPolicy, LoadOutcome, ProfileStore, StoreConfig, DATA_FILE, KEY_FILE,
};

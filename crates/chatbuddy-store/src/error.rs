//! Error types for the profile store.

use std::path::PathBuf;
use thiserror::Error;

/// Profile store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Key file could not be created or read. Fatal: without the key no
    /// stored profile is reachable.
    #[error("key file {path} unavailable: {source}")]
    KeyIo {
        /// Key file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Key file exists but does not hold a usable key
    #[error("invalid key in {path}: {reason}")]
    InvalidKey {
        /// Key file path
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },

    /// Data file I/O failed for a reason other than "not there yet"
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Data file is present but cannot be decrypted or parsed
    #[error("profile data is corrupt: {0}")]
    Corrupt(String),

    /// Encryption of the document failed
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Serializing the document failed
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Username is empty
    #[error("username must not be empty")]
    InvalidUsername,

    /// No profile for the given username
    #[error("profile not found: {0}")]
    NotFound(String),

    /// Unknown profile field name
    #[error("unknown profile field: {0}")]
    UnknownField(String),

    /// Could not take the writer lock in time
    #[error("timed out waiting for lock {path}")]
    LockTimeout {
        /// Lock file path
        path: PathBuf,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

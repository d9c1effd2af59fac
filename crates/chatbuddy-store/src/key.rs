//! Key file lifecycle.
//!
//! The key is generated once and never regenerated while the file exists:
//! losing it makes every stored profile unreadable.

use crate::error::{Result, StoreError};
use chatbuddy_crypto::ProfileKey;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tracing::{debug, info};

/// Load the key from `path`, creating it with fresh random bytes if absent.
///
/// Creation goes through a temp file that is linked into place only if
/// `path` still does not exist, so two processes racing on first start both
/// end up with the winner's key and nobody ever reads a half-written file.
pub fn load_key(path: &Path) -> Result<ProfileKey> {
    match read_key(path) {
        Ok(key) => return Ok(key),
        Err(StoreError::KeyIo { source, .. }) if source.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let key = ProfileKey::generate();
    match create_key_file(path, &key) {
        Ok(()) => {
            info!(path = %path.display(), "Generated new profile encryption key");
            Ok(key)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            debug!(path = %path.display(), "Key file created concurrently, reading it");
            read_key(path)
        }
        Err(source) => Err(StoreError::KeyIo {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn read_key(path: &Path) -> Result<ProfileKey> {
    let raw = std::fs::read(path).map_err(|source| StoreError::KeyIo {
        path: path.to_path_buf(),
        source,
    })?;
    ProfileKey::from_slice(&raw).map_err(|e| StoreError::InvalidKey {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn create_key_file(path: &Path, key: &ProfileKey) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    // NamedTempFile is created 0600 on Unix
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(key.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist_noclobber(path).map_err(|e| e.error)?;
    Ok(())
}

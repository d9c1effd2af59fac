//! Cross-process writer lock.
//!
//! A lock file created with `create_new` marks the data file as being
//! read-modify-written. It holds an owner token (pid plus a random nonce);
//! only the owner removes it. Processes that crash while holding it leave it
//! behind; a lock older than the stale threshold is broken by renaming it to
//! a unique name first, so exactly one waiter wins each stale file.

use crate::error::{Result, StoreError};
use rand::Rng;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};

const RETRY_INTERVAL: Duration = Duration::from_millis(20);

/// Lock timing configuration
#[derive(Debug, Clone, Copy)]
pub struct LockOptions {
    /// Give up after waiting this long
    pub timeout: Duration,
    /// Treat an existing lock file older than this as abandoned
    pub stale_after: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            stale_after: Duration::from_secs(30),
        }
    }
}

/// Held lock; the lock file is removed on drop if it is still ours.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    token: String,
}

impl FileLock {
    /// Acquire the lock at `path`, waiting up to `options.timeout`.
    pub fn acquire(path: &Path, options: LockOptions) -> Result<Self> {
        let deadline = Instant::now() + options.timeout;
        let token = new_token();

        loop {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(mut file) => {
                    let written = file
                        .write_all(token.as_bytes())
                        .and_then(|()| file.sync_all());
                    if let Err(e) = written {
                        let _ = std::fs::remove_file(path);
                        return Err(StoreError::io(path, e));
                    }
                    debug!(path = %path.display(), "Acquired store lock");
                    return Ok(Self {
                        path: path.to_path_buf(),
                        token,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if is_stale(path, options.stale_after) && break_stale(path, &token, options) {
                        continue;
                    }
                    if Instant::now() >= deadline {
                        return Err(StoreError::LockTimeout {
                            path: path.to_path_buf(),
                        });
                    }
                    std::thread::sleep(RETRY_INTERVAL);
                }
                Err(e) => return Err(StoreError::io(path, e)),
            }
        }
    }

    /// Lock file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Owner token written into the lock file
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents == self.token => {
                let _ = std::fs::remove_file(&self.path);
            }
            Ok(_) => {
                warn!(path = %self.path.display(), "Store lock was taken over while held");
            }
            Err(_) => {}
        }
    }
}

fn new_token() -> String {
    format!("{}-{:016x}", std::process::id(), rand::thread_rng().gen::<u64>())
}

fn is_stale(path: &Path, stale_after: Duration) -> bool {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > stale_after)
}

/// Move a stale lock out of the way. Returns whether the caller should retry
/// creating the lock immediately.
///
/// Rename is atomic, so when several waiters see the same stale file only one
/// of them moves it. A waiter that lost the race may instead move a freshly
/// created lock; that one is put back untouched.
fn break_stale(path: &Path, token: &str, options: LockOptions) -> bool {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".stale-{}", token));
    let aside = PathBuf::from(name);

    if let Err(e) = std::fs::rename(path, &aside) {
        // NotFound: someone else already moved or released it
        return e.kind() == ErrorKind::NotFound;
    }
    if is_stale(&aside, options.stale_after) {
        warn!(path = %path.display(), "Breaking stale store lock");
        let _ = std::fs::remove_file(&aside);
        return true;
    }

    // Fresh lock taken by another writer: restore it unless the path has
    // been reclaimed in the meantime.
    if std::fs::hard_link(&aside, path).is_err() {
        warn!(path = %path.display(), "Could not restore a live store lock");
    }
    let _ = std::fs::remove_file(&aside);
    false
}

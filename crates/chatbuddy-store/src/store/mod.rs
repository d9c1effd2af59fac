//! ProfileStore - the encrypted profile document on disk.

use crate::atomic::write_atomic;
use crate::error::{Result, StoreError};
use crate::key::load_key;
use crate::lock::{FileLock, LockOptions};
use crate::profile::{self, Profile, ProfileField, ProfileMap};
use chatbuddy_crypto::{CryptoError, ProfileCipher};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, error, info, warn};


/// Default key file name inside the data directory
pub const KEY_FILE: &str = "secret.key";

/// Default data file name inside the data directory
pub const DATA_FILE: &str = "chat_data.enc";

/// What to do when the data file exists but cannot be read back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptionPolicy {
    /// Surface [`StoreError::Corrupt`] to the caller
    #[default]
    Fail,
    /// Move the file aside, log loudly, and continue with no profiles
    TreatAsEmpty,
}

/// Result of reading the data file.
#[derive(Debug)]
pub enum LoadOutcome {
    /// No data file yet: no users have registered
    Empty,
    /// Data file decrypted and parsed
    Loaded(ProfileMap),
    /// Data file present but undecryptable or not a profile document
    Corrupt(StoreError),
}

impl LoadOutcome {
    /// Number of profiles, zero unless loaded
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Loaded(map) => map.len(),
            _ => 0,
        }
    }

    /// Whether no profiles are available
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Key file path
    pub key_path: PathBuf,
    /// Encrypted data file path
    pub data_path: PathBuf,
    /// Corruption handling
    pub corruption_policy: CorruptionPolicy,
    /// Writer lock timing
    pub lock: LockOptions,
}

impl StoreConfig {
    /// Default file names inside `data_dir`
    #[must_use]
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            key_path: data_dir.join(KEY_FILE),
            data_path: data_dir.join(DATA_FILE),
            corruption_policy: CorruptionPolicy::default(),
            lock: LockOptions::default(),
        }
    }

    /// Set the corruption policy
    #[must_use]
    pub fn with_corruption_policy(mut self, policy: CorruptionPolicy) -> Self {
        self.corruption_policy = policy;
        self
    }

    /// Set the lock timeout
    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock.timeout = timeout;
        self
    }

    /// Set the stale-lock threshold
    #[must_use]
    pub fn with_lock_stale_after(mut self, stale_after: Duration) -> Self {
        self.lock.stale_after = stale_after;
        self
    }
}

/// Encrypted profile store.
///
/// Build one per process and share it. Every mutation goes through
/// [`ProfileStore::modify`], which serializes writers in this process with a
/// mutex and across processes with a lock file, so concurrent updates are
/// applied one after another instead of overwriting each other.
pub struct ProfileStore {
    config: StoreConfig,
    cipher: ProfileCipher,
    lock_path: PathBuf,
    writer: Mutex<()>,
}

impl std::fmt::Debug for ProfileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileStore")
            .field("data_path", &self.config.data_path)
            .field("key_path", &self.config.key_path)
            .field("corruption_policy", &self.config.corruption_policy)
            .finish()
    }
}

impl ProfileStore {
    /// Open the store, creating the key file on first use.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let key = load_key(&config.key_path)?;
        let cipher = ProfileCipher::new(&key);

        let mut lock_name = config.data_path.as_os_str().to_owned();
        lock_name.push(".lock");

        info!(
            data_path = %config.data_path.display(),
            policy = ?config.corruption_policy,
            "Profile store opened"
        );
        Ok(Self {
            lock_path: PathBuf::from(lock_name),
            config,
            cipher,
            writer: Mutex::new(()),
        })
    }

    /// Open with default file names inside `data_dir`
    pub fn open_in(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(StoreConfig::in_dir(data_dir))
    }

    /// Store configuration
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Read and classify the data file without applying any policy.
    pub fn load_all(&self) -> Result<LoadOutcome> {
        let path = &self.config.data_path;
        let envelope = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No profile data file yet");
                return Ok(LoadOutcome::Empty);
            }
            Err(e) => return Err(StoreError::io(path, e)),
        };

        let plaintext = match self.cipher.open(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => return Ok(LoadOutcome::Corrupt(decrypt_error(e))),
        };

        match serde_json::from_slice::<ProfileMap>(&plaintext) {
            Ok(map) => {
                debug!(count = map.len(), "Loaded profiles");
                Ok(LoadOutcome::Loaded(map))
            }
            Err(e) => Ok(LoadOutcome::Corrupt(StoreError::Corrupt(format!(
                "not a profile document: {}",
                e
            )))),
        }
    }

    /// All profiles, with the corruption policy applied.
    ///
    /// Moving a corrupt file aside happens only under the writer lock, after
    /// reading the file again: a writer may have replaced it since the
    /// unlocked read.
    pub fn profiles(&self) -> Result<ProfileMap> {
        match self.load_all()? {
            LoadOutcome::Empty => Ok(ProfileMap::new()),
            LoadOutcome::Loaded(map) => Ok(map),
            LoadOutcome::Corrupt(err) => match self.config.corruption_policy {
                CorruptionPolicy::Fail => self.handle_corrupt(err),
                CorruptionPolicy::TreatAsEmpty => {
                    let _guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
                    let _file_lock = FileLock::acquire(&self.lock_path, self.config.lock)?;
                    self.profiles_locked()
                }
            },
        }
    }

    /// Like [`profiles`](Self::profiles); the caller holds the writer lock.
    fn profiles_locked(&self) -> Result<ProfileMap> {
        match self.load_all()? {
            LoadOutcome::Empty => Ok(ProfileMap::new()),
            LoadOutcome::Loaded(map) => Ok(map),
            LoadOutcome::Corrupt(err) => self.handle_corrupt(err),
        }
    }

    /// Encrypt `map` and atomically replace the data file with it.
    pub fn save_all(&self, map: &ProfileMap) -> Result<()> {
        let json = serde_json::to_vec(map)?;
        let envelope = self
            .cipher
            .seal(&json)
            .map_err(|e| StoreError::Encryption(e.to_string()))?;

        write_atomic(&self.config.data_path, &envelope)?;
        debug!(
            count = map.len(),
            path = %self.config.data_path.display(),
            "Saved profiles"
        );
        Ok(())
    }

    /// Read-modify-write the whole document under the writer lock.
    ///
    /// The closure sees the current map and returns the map to persist.
    /// Returns whatever was saved.
    pub fn modify<F>(&self, operator: F) -> Result<ProfileMap>
    where
        F: FnOnce(ProfileMap) -> Result<ProfileMap>,
    {
        let _guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let _file_lock = FileLock::acquire(&self.lock_path, self.config.lock)?;

        let current = self.profiles_locked()?;
        let updated = operator(current)?;
        self.save_all(&updated)?;
        Ok(updated)
    }

    /// Look up one profile
    pub fn get(&self, username: &str) -> Result<Option<Profile>> {
        let map = self.profiles()?;
        Ok(profile::get_profile(&map, username).cloned())
    }

    /// Insert or replace one profile
    pub fn upsert(&self, username: &str, profile: Profile) -> Result<()> {
        self.modify(|map| profile::upsert_profile(map, username, profile))?;
        info!(username = %username, "Profile saved");
        Ok(())
    }

    /// Register a profile only if the username is free.
    ///
    /// Returns `false` and leaves the stored profile untouched when the
    /// username already exists.
    pub fn register(&self, username: &str, profile: Profile) -> Result<bool> {
        let mut created = false;
        self.modify(|map| {
            if map.contains_key(username) {
                return Ok(map);
            }
            created = true;
            profile::upsert_profile(map, username, profile)
        })?;
        if created {
            info!(username = %username, "Profile registered");
        }
        Ok(created)
    }

    /// Replace a single field of an existing profile
    pub fn update_field(
        &self,
        username: &str,
        field: ProfileField,
        value: &str,
    ) -> Result<Profile> {
        let map = self.modify(|map| {
            let current = profile::get_profile(&map, username)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(username.to_string()))?;
            profile::upsert_profile(map, username, current.with_field(field, value))
        })?;
        info!(username = %username, field = %field, "Profile field updated");
        profile::get_profile(&map, username)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(username.to_string()))
    }

    /// Remove one profile. Returns whether anything was removed; an absent
    /// username is not an error.
    pub fn delete(&self, username: &str) -> Result<bool> {
        let mut removed = false;
        self.modify(|map| {
            removed = map.contains_key(username);
            Ok(profile::delete_profile(map, username))
        })?;
        if removed {
            info!(username = %username, "Profile deleted");
        } else {
            debug!(username = %username, "Delete of unknown profile ignored");
        }
        Ok(removed)
    }

    fn handle_corrupt(&self, err: StoreError) -> Result<ProfileMap> {
        match self.config.corruption_policy {
            CorruptionPolicy::Fail => {
                error!(
                    path = %self.config.data_path.display(),
                    error = %err,
                    "Profile data file is unreadable"
                );
                Err(err)
            }
            CorruptionPolicy::TreatAsEmpty => {
                let backup = self.backup_corrupt_file()?;
                error!(
                    path = %self.config.data_path.display(),
                    backup = %backup.display(),
                    error = %err,
                    "Profile data file is unreadable; moved aside and continuing with no profiles"
                );
                Ok(ProfileMap::new())
            }
        }
    }

    fn backup_corrupt_file(&self) -> Result<PathBuf> {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let mut name = self.config.data_path.as_os_str().to_owned();
        name.push(format!(".corrupt-{}", stamp));
        let backup = PathBuf::from(name);

        match std::fs::rename(&self.config.data_path, &backup) {
            Ok(()) => {
                warn!(backup = %backup.display(), "Corrupt profile data preserved");
                Ok(backup)
            }
            Err(e) => Err(StoreError::io(&self.config.data_path, e)),
        }
    }
}

fn decrypt_error(e: CryptoError) -> StoreError {
    match e {
        CryptoError::DecryptionFailed => {
            StoreError::Corrupt("decryption failed (wrong key or damaged file)".to_string())
        }
        other => StoreError::Corrupt(other.to_string()),
    }
}

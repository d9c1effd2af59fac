//! Atomic file replacement.
//!
//! Data is written to a temp file in the destination directory, flushed to
//! disk, then renamed over the destination. Readers see either the previous
//! file or the new one, never a mix.

use crate::error::{Result, StoreError};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A fully written, fsynced temp file that has not replaced its destination
/// yet. Dropping it without [`StagedWrite::commit`] deletes the temp file and
/// leaves the destination untouched.
pub struct StagedWrite {
    temp: NamedTempFile,
    dest: PathBuf,
}

impl StagedWrite {
    /// Write `data` next to `dest` without touching `dest`.
    pub fn stage(dest: &Path, data: &[u8]) -> Result<Self> {
        let dir = parent_dir(dest);
        std::fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

        let mut temp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
        temp.write_all(data)
            .map_err(|e| StoreError::io(temp.path(), e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| StoreError::io(temp.path(), e))?;

        Ok(Self {
            temp,
            dest: dest.to_path_buf(),
        })
    }

    /// Path of the staged temp file
    #[must_use]
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Rename the temp file over the destination.
    pub fn commit(self) -> Result<()> {
        let dest = self.dest;
        self.temp
            .persist(&dest)
            .map_err(|e| StoreError::io(&dest, e.error))?;

        // Make the rename itself durable
        #[cfg(unix)]
        {
            if let Ok(dir) = std::fs::File::open(parent_dir(&dest)) {
                let _ = dir.sync_all();
            }
        }
        Ok(())
    }
}

/// Atomically replace `dest` with `data`.
pub fn write_atomic(dest: &Path, data: &[u8]) -> Result<()> {
    StagedWrite::stage(dest, data)?.commit()
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.enc");

        write_atomic(&path, b"first").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"first");

        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_interrupted_write_keeps_previous() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.enc");
        write_atomic(&path, b"committed").unwrap();

        let staged = StagedWrite::stage(&path, b"never committed").unwrap();
        let temp_path = staged.temp_path().to_path_buf();
        assert!(temp_path.exists());
        // Destination is untouched while the write is in flight
        assert_eq!(std::fs::read(&path).unwrap(), b"committed");

        // Process "dies" before the rename
        drop(staged);

        assert_eq!(std::fs::read(&path).unwrap(), b"committed");
        assert!(!temp_path.exists());
    }
}

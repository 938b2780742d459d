//! Store directory management.
//!
//! File system layout for a PersiDB store:
//!
//! ```text
//! <store_path>/
//! ├─ LOCK              # Advisory lock for single-process access
//! └─ store.log         # Commit log
//! ```
//!
//! The LOCK file ensures only one process can open the store at a time.

use crate::error::{PersistError, PersistResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const LOG_FILE: &str = "store.log";

/// Manages the store directory and its exclusive lock.
///
/// Only one `StoreDir` instance can exist per directory at a time; the
/// advisory lock is released when the instance is dropped.
#[derive(Debug)]
pub(crate) struct StoreDir {
    path: PathBuf,
    _lock_file: File,
}

impl StoreDir {
    /// Opens or creates a store directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - Another process holds the lock (`StoreLocked`)
    /// - I/O errors occur
    pub(crate) fn open(path: &Path, create_if_missing: bool) -> PersistResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(PersistError::invalid_format(format!(
                    "store directory does not exist: {}",
                    path.display()
                )));
            }
        }

        if !path.is_dir() {
            return Err(PersistError::invalid_format(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_path = path.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(PersistError::StoreLocked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the store directory path.
    #[allow(dead_code)]
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the commit log path.
    pub(crate) fn log_path(&self) -> PathBuf {
        self.path.join(LOG_FILE)
    }

    /// Returns true if no commit log exists yet.
    pub(crate) fn is_new_store(&self) -> bool {
        !self.log_path().exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_creates_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store");

        let dir = StoreDir::open(&path, true).unwrap();
        assert!(path.is_dir());
        assert!(dir.is_new_store());
    }

    #[test]
    fn open_missing_without_create_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent");

        let result = StoreDir::open(&path, false);
        assert!(matches!(result, Err(PersistError::InvalidFormat { .. })));
    }

    #[test]
    fn second_open_is_locked() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store");

        let _first = StoreDir::open(&path, true).unwrap();
        let second = StoreDir::open(&path, true);
        assert!(matches!(second, Err(PersistError::StoreLocked)));
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store");

        drop(StoreDir::open(&path, true).unwrap());
        assert!(StoreDir::open(&path, true).is_ok());
    }

    #[test]
    fn log_path_is_inside_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store");

        let dir = StoreDir::open(&path, true).unwrap();
        assert_eq!(dir.log_path(), path.join("store.log"));
    }
}

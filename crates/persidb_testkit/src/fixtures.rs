//! Test fixtures and store helpers.
//!
//! Provides a reference entity type and convenience functions for
//! setting up test stores.

use persidb_core::{Config, Dao, Entity, SessionProvider, Store};
use persidb_storage::StorageBackend;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Discriminator for the reference entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteKind {
    /// An informational note.
    Notice,
    /// A note that asks for follow-up.
    Reminder,
}

/// Reference entity used across PersiDB tests: a kind discriminator, a
/// free-text message, and an availability flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Assigned on first save; `None` for unsaved notes.
    pub id: Option<u64>,
    /// Note discriminator.
    pub kind: NoteKind,
    /// Free-text message.
    pub message: String,
    /// Availability flag.
    pub available: bool,
}

impl Note {
    /// Creates an unsaved note.
    #[must_use]
    pub fn new(kind: NoteKind, message: &str, available: bool) -> Self {
        Self {
            id: None,
            kind,
            message: message.to_string(),
            available,
        }
    }
}

impl Entity for Note {
    type Key = u64;
    const COLLECTION: &'static str = "notes";

    fn key(&self) -> Option<u64> {
        self.id
    }

    fn assign_key(&mut self, key: u64) {
        self.id = Some(key);
    }
}

/// A test store with automatic cleanup.
pub struct TestStore {
    /// The provider over the store.
    pub provider: SessionProvider,
    /// The temporary directory (kept alive to delay cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates an in-memory test store.
    #[must_use]
    pub fn memory() -> Self {
        Self {
            provider: SessionProvider::open_in_memory()
                .expect("failed to open in-memory store"),
            _temp_dir: None,
        }
    }

    /// Creates a file-backed test store in a temporary directory.
    #[must_use]
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let provider = SessionProvider::open(&temp_dir.path().join("store"))
            .expect("failed to open file store");

        Self {
            provider,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Creates a test store over a pre-configured backend.
    ///
    /// Useful for replay scenarios: seed a `MemoryBackend` with commit-log
    /// bytes and observe what recovery rebuilds.
    #[must_use]
    pub fn from_backend(backend: Box<dyn StorageBackend>) -> Self {
        let store = Store::open_with_backend(Config::default(), backend)
            .expect("failed to open store over backend");

        Self {
            provider: SessionProvider::from_store(Arc::new(store)),
            _temp_dir: None,
        }
    }

    /// Returns the store path if file-backed, `None` if in-memory.
    #[must_use]
    pub fn path(&self) -> Option<PathBuf> {
        self._temp_dir.as_ref().map(|d| d.path().join("store"))
    }
}

impl std::ops::Deref for TestStore {
    type Target = SessionProvider;

    fn deref(&self) -> &Self::Target {
        &self.provider
    }
}

/// Runs a test with a temporary in-memory store.
///
/// # Example
///
/// ```rust,ignore
/// use persidb_testkit::with_temp_store;
///
/// #[test]
/// fn my_test() {
///     with_temp_store(|provider| {
///         let session = provider.session();
///         // ... test operations
///     });
/// }
/// ```
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&SessionProvider) -> R,
{
    let test_store = TestStore::memory();
    f(&test_store.provider)
}

/// Runs a test with a temporary file-backed store.
pub fn with_file_store<F, R>(f: F) -> R
where
    F: FnOnce(&SessionProvider, &std::path::Path) -> R,
{
    let test_store = TestStore::file();
    let path = test_store.path().expect("file store should have a path");
    f(&test_store.provider, &path)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates a store pre-populated with committed notes.
    ///
    /// Messages are `"note-0"` .. `"note-{n-1}"`, alternating kinds, all
    /// unavailable.
    #[must_use]
    pub fn populated_store(note_count: usize) -> TestStore {
        let test_store = TestStore::memory();
        let session = test_store.provider.session();
        let dao: Dao<Note> = Dao::new(session.clone());

        session.begin().expect("begin failed");
        for i in 0..note_count {
            let kind = if i % 2 == 0 {
                NoteKind::Notice
            } else {
                NoteKind::Reminder
            };
            dao.save(&Note::new(kind, &format!("note-{i}"), false))
                .expect("save failed");
        }
        session.commit().expect("commit failed");

        test_store
    }
}

//! Committed store and recovery.

use crate::config::Config;
use crate::dir::StoreDir;
use crate::error::{PersistError, PersistResult};
use crate::log::{self, CommitRecord, LogOp};
use crate::types::SequenceNumber;
use parking_lot::{Mutex, RwLock};
use persidb_storage::{FileBackend, MemoryBackend, StorageBackend};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

type CollectionMap = HashMap<String, BTreeMap<Vec<u8>, Vec<u8>>>;

/// The embedded persistence runtime.
///
/// A `Store` holds the committed state of every collection, allocates
/// entity identities, and makes commits durable by appending one record
/// per committed unit of work to its backend. Opening a store replays the
/// commit log to rebuild the committed state.
///
/// Sessions stage writes and hand them to [`Store::commit`] as a single
/// atomic batch; the store itself never sees uncommitted data.
pub struct Store {
    /// Commit log backend. The lock serializes commits.
    backend: Mutex<Box<dyn StorageBackend>>,
    /// Committed entities: collection name -> encoded key -> payload.
    collections: RwLock<CollectionMap>,
    /// Next commit sequence number.
    next_sequence: AtomicU64,
    /// Last allocated identity value.
    identity_seq: AtomicU64,
    /// Whether to sync the backend on every commit.
    sync_on_commit: bool,
    /// Directory lock for file-backed stores.
    _dir: Option<StoreDir>,
}

impl Store {
    /// Opens a store from a directory path with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if another process holds the store lock
    /// (`StoreLocked`), the commit log fails validation, or I/O fails.
    pub fn open(path: &Path) -> PersistResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens a store from a directory path with custom configuration.
    pub fn open_with_config(path: &Path, config: Config) -> PersistResult<Self> {
        let dir = StoreDir::open(path, config.create_if_missing)?;

        if !config.create_if_missing && dir.is_new_store() {
            return Err(PersistError::invalid_format(
                "store does not exist and create_if_missing is false",
            ));
        }
        if config.error_if_exists && !dir.is_new_store() {
            return Err(PersistError::invalid_format(
                "store already exists and error_if_exists is true",
            ));
        }

        let backend = FileBackend::open(&dir.log_path())?;
        let mut store = Self::open_with_backend(config, Box::new(backend))?;
        store._dir = Some(dir);

        info!(path = %path.display(), "opened store");
        Ok(store)
    }

    /// Opens an ephemeral in-memory store.
    ///
    /// # Errors
    ///
    /// Currently infallible; the signature matches the other constructors.
    pub fn open_in_memory() -> PersistResult<Self> {
        Self::open_with_backend(Config::default(), Box::new(MemoryBackend::new()))
    }

    /// Opens a store over a pre-configured backend, replaying its log.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit log is truncated, corrupt, or of an
    /// unsupported version.
    pub fn open_with_backend(
        config: Config,
        backend: Box<dyn StorageBackend>,
    ) -> PersistResult<Self> {
        let records = log::read_all(backend.as_ref())?;
        let replayed = records.len();

        let mut collections = CollectionMap::new();
        let mut next_sequence = 1u64;
        let mut identity_seq = 0u64;

        for record in records {
            next_sequence = record.sequence + 1;
            identity_seq = record.identity_seq;
            Self::apply(&mut collections, record.ops);
        }

        if replayed > 0 {
            info!(records = replayed, "replayed commit log");
        }

        Ok(Self {
            backend: Mutex::new(backend),
            collections: RwLock::new(collections),
            next_sequence: AtomicU64::new(next_sequence),
            identity_seq: AtomicU64::new(identity_seq),
            sync_on_commit: config.sync_on_commit,
            _dir: None,
        })
    }

    /// Allocates the next value of the identity sequence.
    ///
    /// Values handed to units of work that never commit leave gaps, the
    /// same way database sequences do.
    pub fn allocate_identity(&self) -> u64 {
        self.identity_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Commits a batch of operations atomically.
    ///
    /// The batch is appended to the log as one record and flushed before
    /// it is applied to the committed state. An empty batch consumes a
    /// sequence number but writes nothing.
    pub(crate) fn commit(&self, ops: Vec<LogOp>) -> PersistResult<SequenceNumber> {
        let mut backend = self.backend.lock();
        let sequence = SequenceNumber::new(self.next_sequence.fetch_add(1, Ordering::SeqCst));

        if ops.is_empty() {
            debug!(%sequence, "empty commit");
            return Ok(sequence);
        }

        let record = CommitRecord {
            sequence: sequence.as_u64(),
            identity_seq: self.identity_seq.load(Ordering::SeqCst),
            ops,
        };

        backend.append(&record.encode()?)?;
        backend.flush()?;
        if self.sync_on_commit {
            backend.sync()?;
        }

        let mut collections = self.collections.write();
        let op_count = record.ops.len();
        Self::apply(&mut collections, record.ops);

        debug!(%sequence, ops = op_count, "commit applied");
        Ok(sequence)
    }

    fn apply(collections: &mut CollectionMap, ops: Vec<LogOp>) {
        for op in ops {
            match op {
                LogOp::Put {
                    collection,
                    key,
                    payload,
                } => {
                    collections.entry(collection).or_default().insert(key, payload);
                }
                LogOp::Delete { collection, key } => {
                    if let Some(entities) = collections.get_mut(&collection) {
                        entities.remove(&key);
                    }
                }
            }
        }
    }

    /// Returns the committed payload for a key, if present.
    pub(crate) fn get(&self, collection: &str, key: &[u8]) -> Option<Vec<u8>> {
        self.collections
            .read()
            .get(collection)
            .and_then(|entities| entities.get(key).cloned())
    }

    /// Returns all committed entities of a collection in key order.
    pub(crate) fn scan(&self, collection: &str) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.collections
            .read()
            .get(collection)
            .map(|entities| {
                entities
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the number of committed entities in a collection.
    #[must_use]
    pub fn entity_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Returns the sequence number the next commit will receive.
    #[must_use]
    pub fn next_sequence(&self) -> SequenceNumber {
        SequenceNumber::new(self.next_sequence.load(Ordering::SeqCst))
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("next_sequence", &self.next_sequence.load(Ordering::SeqCst))
            .field("identity_seq", &self.identity_seq.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn put(collection: &str, key: u8, payload: &[u8]) -> LogOp {
        LogOp::Put {
            collection: collection.to_string(),
            key: vec![key],
            payload: payload.to_vec(),
        }
    }

    #[test]
    fn commit_makes_entities_visible() {
        let store = Store::open_in_memory().unwrap();

        store
            .commit(vec![put("notes", 1, b"alpha"), put("notes", 2, b"beta")])
            .unwrap();

        assert_eq!(store.entity_count("notes"), 2);
        assert_eq!(store.get("notes", &[1]), Some(b"alpha".to_vec()));
    }

    #[test]
    fn delete_removes_entity() {
        let store = Store::open_in_memory().unwrap();
        store.commit(vec![put("notes", 1, b"alpha")]).unwrap();

        store
            .commit(vec![LogOp::Delete {
                collection: "notes".to_string(),
                key: vec![1],
            }])
            .unwrap();

        assert_eq!(store.get("notes", &[1]), None);
        assert_eq!(store.entity_count("notes"), 0);
    }

    #[test]
    fn scan_returns_key_order() {
        let store = Store::open_in_memory().unwrap();
        store
            .commit(vec![put("notes", 3, b"c"), put("notes", 1, b"a")])
            .unwrap();

        let entities = store.scan("notes");
        assert_eq!(entities[0].0, vec![1]);
        assert_eq!(entities[1].0, vec![3]);
    }

    #[test]
    fn sequences_are_monotonic() {
        let store = Store::open_in_memory().unwrap();

        let s1 = store.commit(vec![put("notes", 1, b"a")]).unwrap();
        let s2 = store.commit(vec![put("notes", 2, b"b")]).unwrap();
        assert!(s2 > s1);
    }

    #[test]
    fn empty_commit_writes_nothing() {
        let store = Store::open_in_memory().unwrap();
        store.commit(Vec::new()).unwrap();
        assert_eq!(store.entity_count("notes"), 0);
    }

    #[test]
    fn identity_allocation_is_monotonic() {
        let store = Store::open_in_memory().unwrap();
        let a = store.allocate_identity();
        let b = store.allocate_identity();
        assert_eq!(a, 1);
        assert_eq!(b, 2);
    }

    #[test]
    fn reopen_replays_committed_state() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store");

        {
            let store = Store::open(&path).unwrap();
            store.allocate_identity();
            store.allocate_identity();
            store
                .commit(vec![put("notes", 1, b"alpha"), put("notes", 2, b"beta")])
                .unwrap();
        }

        let store = Store::open(&path).unwrap();
        assert_eq!(store.entity_count("notes"), 2);
        assert_eq!(store.get("notes", &[2]), Some(b"beta".to_vec()));
        // Identity sequence resumes past the committed watermark.
        assert_eq!(store.allocate_identity(), 3);
        assert_eq!(store.next_sequence(), SequenceNumber::new(2));
    }

    #[test]
    fn concurrent_open_is_locked() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store");

        let _first = Store::open(&path).unwrap();
        assert!(matches!(Store::open(&path), Err(PersistError::StoreLocked)));
    }

    #[test]
    fn error_if_exists_rejects_existing_store() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store");

        {
            let store = Store::open(&path).unwrap();
            store.commit(vec![put("notes", 1, b"a")]).unwrap();
        }

        let config = Config::new().error_if_exists(true);
        let result = Store::open_with_config(&path, config);
        assert!(matches!(result, Err(PersistError::InvalidFormat { .. })));
    }

    #[test]
    fn missing_store_without_create_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent");

        let config = Config::new().create_if_missing(false);
        let result = Store::open_with_config(&path, config);
        assert!(matches!(result, Err(PersistError::InvalidFormat { .. })));
    }

    #[test]
    fn corrupt_log_tail_fails_open() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store");

        {
            let store = Store::open(&path).unwrap();
            store.commit(vec![put("notes", 1, b"a")]).unwrap();
        }

        // Damage the log tail directly.
        let log_path = path.join("store.log");
        let mut bytes = std::fs::read(&log_path).unwrap();
        bytes.extend_from_slice(b"garbage");
        std::fs::write(&log_path, bytes).unwrap();

        assert!(Store::open(&path).is_err());
    }
}

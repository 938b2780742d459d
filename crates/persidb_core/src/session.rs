//! Session: the entity-manager handle.

use crate::error::{PersistError, PersistResult};
use crate::store::Store;
use crate::transaction::{StagedWrite, TransactionStatus, UnitOfWork};
use crate::types::{SequenceNumber, UnitOfWorkId};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

struct SessionInner {
    store: Arc<Store>,
    work: Mutex<UnitOfWork>,
    next_unit: AtomicU64,
}

/// A session over a store: one unit of work at a time, with explicit
/// transaction control.
///
/// The session is the transaction boundary: DAOs stage writes through it
/// and hold no transaction state of their own. Handles are cheap clones
/// sharing the same unit of work, so a DAO and the code driving the
/// transaction observe a single context.
///
/// Writes staged while no transaction is active are never committed: the
/// next `begin` discards them. Committing or rolling back without an
/// active transaction is an error, never a silent no-op.
///
/// # Example
///
/// ```rust,ignore
/// let session = provider.session();
/// session.begin()?;
/// dao.save(&note)?;
/// session.commit()?;
/// ```
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Creates a session over a store.
    pub(crate) fn new(store: Arc<Store>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                store,
                work: Mutex::new(UnitOfWork::new(UnitOfWorkId::new(0))),
                next_unit: AtomicU64::new(1),
            }),
        }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<Store> {
        &self.inner.store
    }

    /// Returns the current transaction status.
    #[must_use]
    pub fn status(&self) -> TransactionStatus {
        self.inner.work.lock().status()
    }

    /// Begins a new transaction.
    ///
    /// Starts a fresh unit of work; writes staged outside any transaction
    /// are discarded here.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if a transaction is already active.
    pub fn begin(&self) -> PersistResult<()> {
        let mut work = self.inner.work.lock();
        if work.status().is_active() {
            return Err(PersistError::invalid_operation(
                "transaction already active",
            ));
        }

        let id = UnitOfWorkId::new(self.inner.next_unit.fetch_add(1, Ordering::SeqCst));
        work.begin(id);
        debug!(unit = %id, "transaction begun");
        Ok(())
    }

    /// Commits the active transaction.
    ///
    /// Applies all staged writes to the store as one atomic batch. A
    /// commit that fails in the store leaves the unit of work rolled
    /// back; the caller must begin a fresh transaction either way.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if no transaction is active, or the
    /// store's error if appending the commit record fails.
    pub fn commit(&self) -> PersistResult<SequenceNumber> {
        let mut work = self.inner.work.lock();
        self.ensure_active(&work, "commit")?;

        let ops = work.take_ops();
        match self.inner.store.commit(ops) {
            Ok(sequence) => {
                work.mark_committed();
                debug!(unit = %work.id(), %sequence, "transaction committed");
                Ok(sequence)
            }
            Err(e) => {
                work.mark_rolled_back();
                Err(e)
            }
        }
    }

    /// Rolls back the active transaction, discarding staged writes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if no transaction is active.
    pub fn rollback(&self) -> PersistResult<()> {
        let mut work = self.inner.work.lock();
        self.ensure_active(&work, "rollback")?;

        work.mark_rolled_back();
        debug!(unit = %work.id(), "transaction rolled back");
        Ok(())
    }

    /// Runs a closure in a fresh transaction.
    ///
    /// Commits if the closure returns `Ok`, rolls back if it returns
    /// `Err`.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or any transaction error.
    pub fn in_transaction<F, R>(&self, f: F) -> PersistResult<R>
    where
        F: FnOnce(&Session) -> PersistResult<R>,
    {
        self.begin()?;
        match f(self) {
            Ok(result) => {
                self.commit()?;
                Ok(result)
            }
            Err(e) => {
                // Don't mask the original error
                let _ = self.rollback();
                Err(e)
            }
        }
    }

    fn ensure_active(&self, work: &UnitOfWork, operation: &str) -> PersistResult<()> {
        match work.status() {
            TransactionStatus::Active => Ok(()),
            TransactionStatus::NoTransaction => Err(PersistError::invalid_operation(format!(
                "{operation} with no transaction begun"
            ))),
            TransactionStatus::Committed => Err(PersistError::invalid_operation(format!(
                "{operation} after transaction already committed"
            ))),
            TransactionStatus::RolledBack => Err(PersistError::invalid_operation(format!(
                "{operation} after transaction already rolled back"
            ))),
        }
    }

    /// Stages an insert-or-update into the current unit of work.
    pub(crate) fn stage_put(&self, collection: &str, key: Vec<u8>, payload: Vec<u8>) {
        self.inner
            .work
            .lock()
            .stage_put(collection.to_string(), key, payload);
    }

    /// Stages a delete into the current unit of work.
    pub(crate) fn stage_delete(&self, collection: &str, key: Vec<u8>) {
        self.inner
            .work
            .lock()
            .stage_delete(collection.to_string(), key);
    }

    /// Reads one entity as visible to this session.
    ///
    /// Inside an active transaction, staged writes shadow committed state
    /// (read-your-own-writes). Outside one, only committed state is
    /// visible.
    pub(crate) fn read(&self, collection: &str, key: &[u8]) -> Option<Vec<u8>> {
        let work = self.inner.work.lock();
        if work.status().is_active() {
            if let Some(staged) = work.staged(collection, key) {
                return match staged {
                    StagedWrite::Put { payload } => Some(payload.clone()),
                    StagedWrite::Delete => None,
                };
            }
        }
        self.inner.store.get(collection, key)
    }

    /// Reads all entities of a collection as visible to this session, in
    /// key order.
    pub(crate) fn read_all(&self, collection: &str) -> Vec<(Vec<u8>, Vec<u8>)> {
        let work = self.inner.work.lock();
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.inner.store.scan(collection).into_iter().collect();

        if work.status().is_active() {
            for (key, write) in work.staged_in(collection) {
                match write {
                    StagedWrite::Put { payload } => {
                        merged.insert(key.clone(), payload.clone());
                    }
                    StagedWrite::Delete => {
                        merged.remove(key);
                    }
                }
            }
        }

        merged.into_iter().collect()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let work = self.inner.work.lock();
        f.debug_struct("Session")
            .field("unit", &work.id())
            .field("status", &work.status())
            .field("staged_writes", &work.write_count())
            .finish_non_exhaustive()
    }
}

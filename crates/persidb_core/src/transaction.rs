//! Transaction status and the unit of work.

use crate::log::LogOp;
use crate::types::UnitOfWorkId;
use std::collections::BTreeMap;

/// State of a session's transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// No transaction has been begun.
    NoTransaction,
    /// A transaction is active and can stage operations.
    Active,
    /// The unit of work was committed.
    Committed,
    /// The unit of work was rolled back.
    RolledBack,
}

impl TransactionStatus {
    /// Returns true if operations staged now can still be committed.
    #[must_use]
    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}

/// A staged write within a unit of work.
#[derive(Debug, Clone)]
pub(crate) enum StagedWrite {
    /// Insert or update an entity.
    Put {
        /// Encoded entity payload.
        payload: Vec<u8>,
    },
    /// Delete an entity.
    Delete,
}

/// One unit of work: staged writes plus the transaction status.
///
/// The session owns exactly one unit of work at a time. `begin` resets it;
/// writes staged outside an active transaction sit in the buffer until the
/// next `begin` discards them, so they can never become visible.
#[derive(Debug)]
pub(crate) struct UnitOfWork {
    id: UnitOfWorkId,
    status: TransactionStatus,
    /// Staged writes: (collection, encoded key) -> write. Ordered so
    /// commit batches are deterministic.
    writes: BTreeMap<(String, Vec<u8>), StagedWrite>,
}

impl UnitOfWork {
    pub(crate) fn new(id: UnitOfWorkId) -> Self {
        Self {
            id,
            status: TransactionStatus::NoTransaction,
            writes: BTreeMap::new(),
        }
    }

    pub(crate) fn id(&self) -> UnitOfWorkId {
        self.id
    }

    pub(crate) fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Starts a fresh unit of work, discarding any staged writes.
    pub(crate) fn begin(&mut self, id: UnitOfWorkId) {
        self.id = id;
        self.status = TransactionStatus::Active;
        self.writes.clear();
    }

    pub(crate) fn mark_committed(&mut self) {
        self.status = TransactionStatus::Committed;
    }

    pub(crate) fn mark_rolled_back(&mut self) {
        self.status = TransactionStatus::RolledBack;
        self.writes.clear();
    }

    /// Stages a put. Allowed in any state; only an active unit of work
    /// ever commits its buffer.
    pub(crate) fn stage_put(&mut self, collection: String, key: Vec<u8>, payload: Vec<u8>) {
        self.writes
            .insert((collection, key), StagedWrite::Put { payload });
    }

    /// Stages a delete.
    pub(crate) fn stage_delete(&mut self, collection: String, key: Vec<u8>) {
        self.writes.insert((collection, key), StagedWrite::Delete);
    }

    /// Looks up the staged write for a key, if any.
    pub(crate) fn staged(&self, collection: &str, key: &[u8]) -> Option<&StagedWrite> {
        self.writes
            .get(&(collection.to_string(), key.to_vec()))
    }

    /// Iterates staged writes for one collection.
    pub(crate) fn staged_in<'a>(
        &'a self,
        collection: &'a str,
    ) -> impl Iterator<Item = (&'a Vec<u8>, &'a StagedWrite)> + 'a {
        self.writes
            .iter()
            .filter(move |((c, _), _)| c == collection)
            .map(|((_, k), w)| (k, w))
    }

    /// Drains the staged writes into commit-log operations.
    pub(crate) fn take_ops(&mut self) -> Vec<LogOp> {
        std::mem::take(&mut self.writes)
            .into_iter()
            .map(|((collection, key), write)| match write {
                StagedWrite::Put { payload } => LogOp::Put {
                    collection,
                    key,
                    payload,
                },
                StagedWrite::Delete => LogOp::Delete { collection, key },
            })
            .collect()
    }

    pub(crate) fn write_count(&self) -> usize {
        self.writes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> UnitOfWork {
        let mut work = UnitOfWork::new(UnitOfWorkId::new(1));
        work.begin(UnitOfWorkId::new(1));
        work
    }

    #[test]
    fn new_unit_has_no_transaction() {
        let work = UnitOfWork::new(UnitOfWorkId::new(1));
        assert_eq!(work.status(), TransactionStatus::NoTransaction);
    }

    #[test]
    fn begin_activates() {
        let work = unit();
        assert!(work.status().is_active());
    }

    #[test]
    fn put_then_delete_keeps_last_write() {
        let mut work = unit();
        work.stage_put("notes".to_string(), vec![1], vec![10]);
        work.stage_delete("notes".to_string(), vec![1]);

        assert_eq!(work.write_count(), 1);
        assert!(matches!(
            work.staged("notes", &[1]),
            Some(StagedWrite::Delete)
        ));
    }

    #[test]
    fn put_overwrites_previous() {
        let mut work = unit();
        work.stage_put("notes".to_string(), vec![1], vec![10]);
        work.stage_put("notes".to_string(), vec![1], vec![20]);

        assert_eq!(work.write_count(), 1);
        match work.staged("notes", &[1]) {
            Some(StagedWrite::Put { payload }) => assert_eq!(payload, &vec![20]),
            other => panic!("expected Put, got {other:?}"),
        }
    }

    #[test]
    fn begin_discards_staged_writes() {
        let mut work = unit();
        work.stage_put("notes".to_string(), vec![1], vec![10]);

        work.begin(UnitOfWorkId::new(2));
        assert_eq!(work.write_count(), 0);
        assert_eq!(work.id(), UnitOfWorkId::new(2));
    }

    #[test]
    fn rollback_discards_staged_writes() {
        let mut work = unit();
        work.stage_put("notes".to_string(), vec![1], vec![10]);

        work.mark_rolled_back();
        assert_eq!(work.status(), TransactionStatus::RolledBack);
        assert_eq!(work.write_count(), 0);
    }

    #[test]
    fn staged_in_filters_by_collection() {
        let mut work = unit();
        work.stage_put("notes".to_string(), vec![1], vec![10]);
        work.stage_put("other".to_string(), vec![2], vec![20]);

        let staged: Vec<_> = work.staged_in("notes").collect();
        assert_eq!(staged.len(), 1);
        assert_eq!(staged[0].0, &vec![1]);
    }

    #[test]
    fn take_ops_preserves_key_order() {
        let mut work = unit();
        work.stage_put("notes".to_string(), vec![2], vec![20]);
        work.stage_put("notes".to_string(), vec![1], vec![10]);

        let ops = work.take_ops();
        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[0], LogOp::Put { key, .. } if key == &vec![1]));
        assert_eq!(work.write_count(), 0);
    }
}

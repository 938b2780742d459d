//! Session provider: the process-wide session accessor.

use crate::config::Config;
use crate::error::PersistResult;
use crate::session::Session;
use crate::store::Store;
use std::path::Path;
use std::sync::Arc;

/// Owns a store and vends the session bound to it.
///
/// `session()` returns the shared session handle, so every caller that
/// goes through the provider participates in the same transaction
/// context, the pattern of a process-wide entity-manager accessor.
/// Independent contexts over the same store are available through
/// [`SessionProvider::new_session`].
///
/// # Example
///
/// ```rust,ignore
/// use persidb_core::{Dao, SessionProvider};
///
/// let provider = SessionProvider::open_in_memory()?;
/// let dao: Dao<Note> = Dao::new(provider.session());
///
/// let session = provider.session();
/// session.begin()?;
/// dao.save(&Note::new("hello"))?;
/// session.commit()?;
/// ```
#[derive(Debug)]
pub struct SessionProvider {
    store: Arc<Store>,
    session: Session,
}

impl SessionProvider {
    /// Opens a provider over a directory-backed store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened.
    pub fn open(path: &Path) -> PersistResult<Self> {
        Ok(Self::from_store(Arc::new(Store::open(path)?)))
    }

    /// Opens a provider over a directory-backed store with configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened.
    pub fn open_with_config(path: &Path, config: Config) -> PersistResult<Self> {
        Ok(Self::from_store(Arc::new(Store::open_with_config(
            path, config,
        )?)))
    }

    /// Opens a provider over an ephemeral in-memory store.
    ///
    /// # Errors
    ///
    /// Currently infallible; the signature matches the other constructors.
    pub fn open_in_memory() -> PersistResult<Self> {
        Ok(Self::from_store(Arc::new(Store::open_in_memory()?)))
    }

    /// Wraps an existing store.
    #[must_use]
    pub fn from_store(store: Arc<Store>) -> Self {
        let session = Session::new(Arc::clone(&store));
        Self { store, session }
    }

    /// Returns the shared session handle.
    #[must_use]
    pub fn session(&self) -> Session {
        self.session.clone()
    }

    /// Returns a fresh session with its own unit-of-work context.
    #[must_use]
    pub fn new_session(&self) -> Session {
        Session::new(Arc::clone(&self.store))
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionStatus;

    #[test]
    fn session_is_shared() {
        let provider = SessionProvider::open_in_memory().unwrap();

        let a = provider.session();
        let b = provider.session();

        a.begin().unwrap();
        assert_eq!(b.status(), TransactionStatus::Active);
    }

    #[test]
    fn new_session_is_independent() {
        let provider = SessionProvider::open_in_memory().unwrap();

        let shared = provider.session();
        let fresh = provider.new_session();

        shared.begin().unwrap();
        assert_eq!(fresh.status(), TransactionStatus::NoTransaction);
    }

    #[test]
    fn sessions_share_committed_state() {
        let provider = SessionProvider::open_in_memory().unwrap();

        let writer = provider.session();
        writer.begin().unwrap();
        writer.stage_put("notes", vec![1], vec![10]);
        writer.commit().unwrap();

        let reader = provider.new_session();
        assert_eq!(reader.read("notes", &[1]), Some(vec![10]));
    }
}

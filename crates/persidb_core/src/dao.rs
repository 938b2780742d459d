//! Generic DAO over a session.

use crate::codec;
use crate::entity::{Entity, EntityKey};
use crate::error::{PersistError, PersistResult};
use crate::session::Session;
use std::marker::PhantomData;

/// A generic persistence access object for one entity type.
///
/// `Dao<E>` is a thin CRUD layer over a [`Session`]: it encodes entities,
/// stages writes into the session's unit of work, and decodes what the
/// session makes visible. It performs no transaction management of its
/// own: callers begin, commit, and roll back on the session, and a save
/// issued outside an active transaction is never committed.
///
/// # Example
///
/// ```rust,ignore
/// use persidb_core::{Dao, SessionProvider};
///
/// let provider = SessionProvider::open_in_memory()?;
/// let dao: Dao<Note> = Dao::new(provider.session());
/// let session = dao.session().clone();
///
/// session.begin()?;
/// let saved = dao.save(&Note::new("hello"))?;
/// session.commit()?;
///
/// assert_eq!(dao.get_all()?.len(), 1);
/// ```
pub struct Dao<E: Entity> {
    session: Session,
    _marker: PhantomData<E>,
}

impl<E: Entity> Dao<E> {
    /// Creates a DAO over the given session.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            session,
            _marker: PhantomData,
        }
    }

    /// Returns the session this DAO stages through.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Saves an entity into the caller's unit of work.
    ///
    /// A keyless entity is an insert: it receives a key derived from the
    /// store's identity sequence. A keyed entity is an update of the
    /// committed entity under that key. Either way the write only becomes
    /// visible to other sessions if the caller commits.
    ///
    /// Returns the entity as staged, with its key assigned.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the entity or key cannot be encoded.
    pub fn save(&self, entity: &E) -> PersistResult<E> {
        let mut staged = entity.clone();
        if staged.key().is_none() {
            let identity = self.session.store().allocate_identity();
            staged.assign_key(E::Key::from_identity(identity));
        }

        let key = staged.key().ok_or_else(|| {
            PersistError::invalid_operation("entity key unassigned after identity allocation")
        })?;

        let key_bytes = codec::to_bytes(&key)?;
        let payload = codec::to_bytes(&staged)?;
        self.session.stage_put(E::COLLECTION, key_bytes, payload);

        Ok(staged)
    }

    /// Returns all entities of this type visible to the session, in key
    /// order.
    ///
    /// Inside an active transaction this reflects the session's own
    /// uncommitted writes; writes that were rolled back are gone.
    ///
    /// # Errors
    ///
    /// Returns a codec error if a stored payload cannot be decoded.
    pub fn get_all(&self) -> PersistResult<Vec<E>> {
        self.session
            .read_all(E::COLLECTION)
            .into_iter()
            .map(|(_, payload)| codec::from_bytes(&payload))
            .collect()
    }

    /// Looks up one entity by key, honoring read-your-own-writes.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the key cannot be encoded or the payload
    /// cannot be decoded.
    pub fn find(&self, key: &E::Key) -> PersistResult<Option<E>> {
        let key_bytes = codec::to_bytes(key)?;
        match self.session.read(E::COLLECTION, &key_bytes) {
            Some(payload) => Ok(Some(codec::from_bytes(&payload)?)),
            None => Ok(None),
        }
    }

    /// Stages a delete of the entity under the given key.
    ///
    /// Takes effect only if the caller commits.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the key cannot be encoded.
    pub fn delete(&self, key: &E::Key) -> PersistResult<()> {
        let key_bytes = codec::to_bytes(key)?;
        self.session.stage_delete(E::COLLECTION, key_bytes);
        Ok(())
    }

    /// Returns true if an entity is visible under the given key.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the key cannot be encoded.
    pub fn exists(&self, key: &E::Key) -> PersistResult<bool> {
        let key_bytes = codec::to_bytes(key)?;
        Ok(self.session.read(E::COLLECTION, &key_bytes).is_some())
    }

    /// Returns the number of entities visible to the session.
    #[must_use]
    pub fn count(&self) -> usize {
        self.session.read_all(E::COLLECTION).len()
    }
}

impl<E: Entity> std::fmt::Debug for Dao<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dao")
            .field("collection", &E::COLLECTION)
            .finish_non_exhaustive()
    }
}

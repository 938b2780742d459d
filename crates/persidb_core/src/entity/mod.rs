//! Entity traits.

mod key;

pub use key::EntityKey;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Trait for types that can be persisted through a [`crate::Dao`].
///
/// An entity carries an optional key: `None` until the entity has been
/// saved (the store assigns a key from its identity sequence at that
/// point), `Some` afterwards. Whether `save` inserts or updates is decided
/// by this distinction.
///
/// # Example
///
/// ```rust,ignore
/// use persidb_core::{Entity, EntityKey};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct User {
///     id: Option<u64>,
///     name: String,
/// }
///
/// impl Entity for User {
///     type Key = u64;
///     const COLLECTION: &'static str = "users";
///
///     fn key(&self) -> Option<u64> {
///         self.id
///     }
///
///     fn assign_key(&mut self, key: u64) {
///         self.id = Some(key);
///     }
/// }
/// ```
pub trait Entity: Clone + Serialize + DeserializeOwned {
    /// The entity's primary-key type.
    type Key: EntityKey;

    /// Name of the collection entities of this type live in.
    ///
    /// Must be stable for the lifetime of the store.
    const COLLECTION: &'static str;

    /// Returns the entity's key, or `None` if it has not been persisted.
    fn key(&self) -> Option<Self::Key>;

    /// Assigns the entity's key.
    ///
    /// Called once, when a keyless entity is first saved. After this
    /// returns, `key()` must return `Some`.
    fn assign_key(&mut self, key: Self::Key);
}

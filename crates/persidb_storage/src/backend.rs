//! Storage backend trait definition.

use crate::error::StorageResult;

/// A low-level storage backend for PersiDB.
///
/// Backends are append-only byte stores with random read access. The
/// commit log appends framed records and replays them on open; backends
/// never interpret record boundaries themselves.
///
/// # Invariants
///
/// - `append` returns the offset the data was written at
/// - `read_at` returns exactly the bytes previously written at that offset
/// - `flush` pushes buffered writes towards durable storage
/// - `sync` additionally makes file metadata durable
/// - Backends must be `Send + Sync` so a store handle can be shared
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::ReadPastEnd`] if the requested range
    /// extends beyond the current size, or an I/O error from the backend.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends data at the end of the backend.
    ///
    /// Returns the offset the data was written at.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Flushes buffered writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Syncs data and metadata to durable storage.
    ///
    /// Stronger than `flush`: after this returns, appended data survives
    /// process termination.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Returns the current size in bytes.
    ///
    /// This is the offset the next `append` will write at.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn len(&self) -> StorageResult<u64>;

    /// Returns true if the backend holds no data.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }
}

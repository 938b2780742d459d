//! Error types for PersiDB core.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Errors that can occur in PersiDB core operations.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] persidb_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Entity or record encoding/decoding failed.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the codec failure.
        message: String,
    },

    /// The commit log is corrupted or invalid.
    #[error("commit log corruption: {message}")]
    LogCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// Checksum mismatch in a commit-log record.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Checksum stored in the record envelope.
        expected: u32,
        /// Checksum computed over the record payload.
        actual: u32,
    },

    /// Operation not permitted in the current transaction state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },

    /// Invalid store format or layout.
    #[error("invalid store format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// The store is already open in another process.
    #[error("store locked: another process has exclusive access")]
    StoreLocked,
}

impl PersistError {
    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Creates a commit log corruption error.
    pub fn log_corruption(message: impl Into<String>) -> Self {
        Self::LogCorruption {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }
}

//! Commit log records and framing.
//!
//! The commit log is the store's durability mechanism: each committed unit
//! of work appends exactly one framed record, and recovery replays the log
//! from the start. Record envelope:
//!
//! ```text
//! magic (4) | version (2, LE) | payload len (4, LE) | checksum (4, LE) | payload (CBOR)
//! ```
//!
//! The checksum is the first four bytes of the SHA-256 digest of the
//! payload. A record that fails any envelope check poisons the log from
//! that offset onward.

use crate::error::{PersistError, PersistResult};
use persidb_storage::StorageBackend;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Magic bytes identifying a commit-log record.
pub const LOG_MAGIC: [u8; 4] = *b"PLOG";

/// Current commit-log format version.
pub const LOG_VERSION: u16 = 1;

/// Envelope size preceding each record payload.
const ENVELOPE_LEN: usize = 14;

/// A single operation within a committed unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogOp {
    /// Insert or update an entity.
    Put {
        /// Collection the entity belongs to.
        collection: String,
        /// Encoded entity key.
        key: Vec<u8>,
        /// Encoded entity payload.
        payload: Vec<u8>,
    },
    /// Delete an entity.
    Delete {
        /// Collection the entity belongs to.
        collection: String,
        /// Encoded entity key.
        key: Vec<u8>,
    },
}

/// A committed unit of work as recorded in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Commit sequence number.
    pub sequence: u64,
    /// Identity-sequence watermark at commit time. Recovery restores the
    /// allocator from the last record's watermark.
    pub identity_seq: u64,
    /// Operations applied by this commit, in key order.
    pub ops: Vec<LogOp>,
}

impl CommitRecord {
    /// Serializes the record with its envelope.
    pub fn encode(&self) -> PersistResult<Vec<u8>> {
        let payload = crate::codec::to_bytes(self)?;
        let len = u32::try_from(payload.len()).map_err(|_| {
            PersistError::invalid_format("commit record payload exceeds 4 GiB")
        })?;

        let mut buf = Vec::with_capacity(ENVELOPE_LEN + payload.len());
        buf.extend_from_slice(&LOG_MAGIC);
        buf.extend_from_slice(&LOG_VERSION.to_le_bytes());
        buf.extend_from_slice(&len.to_le_bytes());
        buf.extend_from_slice(&checksum(&payload).to_le_bytes());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }
}

/// Computes the record checksum: the first four bytes of SHA-256.
fn checksum(payload: &[u8]) -> u32 {
    let digest = Sha256::digest(payload);
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&digest[..4]);
    u32::from_le_bytes(bytes)
}

/// Reads all commit records from a backend, validating each envelope.
///
/// # Errors
///
/// Returns `LogCorruption` for a truncated envelope or payload, an
/// unrecognized magic or version, or `ChecksumMismatch` when a payload
/// does not match its recorded checksum.
pub fn read_all(backend: &dyn StorageBackend) -> PersistResult<Vec<CommitRecord>> {
    let size = backend.len()?;
    let mut records = Vec::new();
    let mut offset = 0u64;

    while offset < size {
        if size - offset < ENVELOPE_LEN as u64 {
            return Err(PersistError::log_corruption(format!(
                "truncated record envelope at offset {offset}"
            )));
        }

        let envelope = backend.read_at(offset, ENVELOPE_LEN)?;
        if envelope[0..4] != LOG_MAGIC {
            return Err(PersistError::log_corruption(format!(
                "bad record magic at offset {offset}"
            )));
        }

        let version = u16::from_le_bytes([envelope[4], envelope[5]]);
        if version != LOG_VERSION {
            return Err(PersistError::invalid_format(format!(
                "unsupported commit log version {version}"
            )));
        }

        let len = u32::from_le_bytes([envelope[6], envelope[7], envelope[8], envelope[9]]) as u64;
        let expected =
            u32::from_le_bytes([envelope[10], envelope[11], envelope[12], envelope[13]]);

        let payload_offset = offset + ENVELOPE_LEN as u64;
        if size - payload_offset < len {
            return Err(PersistError::log_corruption(format!(
                "truncated record payload at offset {payload_offset}"
            )));
        }

        let payload = backend.read_at(payload_offset, len as usize)?;
        let actual = checksum(&payload);
        if actual != expected {
            return Err(PersistError::ChecksumMismatch { expected, actual });
        }

        records.push(crate::codec::from_bytes(&payload)?);
        offset = payload_offset + len;
    }

    Ok(records)
}

//! CBOR encoding helpers.
//!
//! Keys, entity payloads, and commit-log records all go through serde +
//! CBOR. Struct fields serialize in declaration order, so equal values
//! produce identical bytes.

use crate::error::{PersistError, PersistResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes a value to CBOR bytes.
pub(crate) fn to_bytes<T: Serialize>(value: &T) -> PersistResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| PersistError::codec(e.to_string()))?;
    Ok(buf)
}

/// Decodes a value from CBOR bytes.
pub(crate) fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> PersistResult<T> {
    ciborium::from_reader(bytes).map_err(|e| PersistError::codec(e.to_string()))
}

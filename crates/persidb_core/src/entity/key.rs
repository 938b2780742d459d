//! Entity key trait and implementations.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::hash::Hash;
use uuid::Uuid;

/// Trait for entity primary-key types.
///
/// Keys are serde-encoded into the store's key space, so implementors
/// must serialize deterministically. `from_identity` derives a fresh key
/// from the store's monotonic identity sequence; two distinct identity
/// values must never map to the same key.
pub trait EntityKey: Clone + Eq + Hash + Serialize + DeserializeOwned + fmt::Debug {
    /// Derives a key from an identity-sequence value.
    fn from_identity(value: u64) -> Self;
}

impl EntityKey for u64 {
    fn from_identity(value: u64) -> Self {
        value
    }
}

impl EntityKey for u32 {
    /// Truncates; stores holding more than `u32::MAX` identities need a
    /// wider key type.
    fn from_identity(value: u64) -> Self {
        value as u32
    }
}

impl EntityKey for i64 {
    fn from_identity(value: u64) -> Self {
        value as i64
    }
}

impl EntityKey for i32 {
    /// Truncates; stores holding more than `i32::MAX` identities need a
    /// wider key type.
    fn from_identity(value: u64) -> Self {
        value as i32
    }
}

impl EntityKey for Uuid {
    /// Embeds the identity value in a deterministic UUID, so keys are
    /// stable across log replay.
    fn from_identity(value: u64) -> Self {
        Uuid::from_u128(u128::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_keys_are_identity_values() {
        assert_eq!(u64::from_identity(7), 7);
        assert_eq!(i64::from_identity(7), 7);
        assert_eq!(u32::from_identity(7), 7);
        assert_eq!(i32::from_identity(7), 7);
    }

    #[test]
    fn uuid_keys_are_distinct_and_deterministic() {
        let a = Uuid::from_identity(1);
        let b = Uuid::from_identity(2);
        assert_ne!(a, b);
        assert_eq!(a, Uuid::from_identity(1));
    }
}

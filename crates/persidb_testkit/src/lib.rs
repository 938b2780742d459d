//! # PersiDB Testkit
//!
//! Test utilities for PersiDB.
//!
//! This crate provides:
//! - Store fixtures with automatic cleanup
//! - A reference [`fixtures::Note`] entity
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use persidb_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_store() {
//!     with_temp_store(|provider| {
//!         let session = provider.session();
//!         // ... test operations
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;

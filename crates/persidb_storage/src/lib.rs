//! # PersiDB Storage
//!
//! Storage backend trait and implementations for PersiDB.
//!
//! This crate provides the lowest-level storage abstraction for PersiDB.
//! Backends are **opaque byte stores**: append-only buffers with random
//! read access. They do not interpret the data they hold; the commit-log
//! format lives entirely in `persidb_core`.
//!
//! ## Available Backends
//!
//! - [`MemoryBackend`] - For tests and ephemeral stores
//! - [`FileBackend`] - For persistent stores using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use persidb_storage::{StorageBackend, MemoryBackend};
//!
//! let mut backend = MemoryBackend::new();
//! let offset = backend.append(b"hello world").unwrap();
//! let data = backend.read_at(offset, 11).unwrap();
//! assert_eq!(&data, b"hello world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::MemoryBackend;

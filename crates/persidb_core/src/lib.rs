//! # PersiDB Core
//!
//! Embedded persistence runtime and generic DAO for PersiDB.
//!
//! This crate provides:
//! - A commit-log-backed [`Store`] with replay recovery
//! - [`Session`], the entity-manager handle with explicit transaction
//!   control (begin / commit / rollback, never autocommit)
//! - [`SessionProvider`], the process-wide session accessor
//! - [`Dao`], a generic CRUD layer parameterized by entity type
//! - The [`Entity`] and [`EntityKey`] traits
//!
//! ## Example
//!
//! ```rust,ignore
//! use persidb_core::{Dao, SessionProvider};
//!
//! let provider = SessionProvider::open_in_memory()?;
//! let dao: Dao<Note> = Dao::new(provider.session());
//! let session = provider.session();
//!
//! session.begin()?;
//! dao.save(&Note::new("hello"))?;
//! session.commit()?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod config;
mod dao;
mod dir;
mod entity;
mod error;
mod log;
mod provider;
mod session;
mod store;
mod transaction;
mod types;

pub use config::Config;
pub use dao::Dao;
pub use entity::{Entity, EntityKey};
pub use error::{PersistError, PersistResult};
pub use log::{CommitRecord, LogOp, LOG_MAGIC, LOG_VERSION};
pub use provider::SessionProvider;
pub use session::Session;
pub use store::Store;
pub use transaction::TransactionStatus;
pub use types::{SequenceNumber, UnitOfWorkId};

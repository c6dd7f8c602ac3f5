//! Core traits and types for stowage storage backends.
//!
//! This crate defines the abstractions shared between the namespace router and
//! the storage adapters behind it:
//! - `StorageBackend`: the stat / list / mkdir / put capability every backend implements
//! - `ProtocolDriver`: the full operation set a file-transfer protocol engine calls into
//! - `EntryMetadata`: the normalized entry shape flowing back through the router
//! - `StorageError`: the error taxonomy shared by every layer

mod backend;
mod error;
mod metadata;
pub mod path;

pub use backend::{ByteStream, ProtocolDriver, StorageBackend, Visitor};
pub use error::{StorageError, StorageResult};
pub use metadata::{mode_from_permission, EntryMetadata, SYNTHETIC_DIR_MODE};

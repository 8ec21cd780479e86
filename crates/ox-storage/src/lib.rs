//! # ox-storage
//!
//! Durable, directory-style storage for session entries.
//!
//! Entries are uniquely keyed by their DN (`oxId=<id>,<sessions-base-dn>`)
//! and carry a version used for optimistic concurrency: a merge against a
//! stale version is rejected with [`StorageError::Conflict`] instead of
//! overwriting a concurrent writer.
//!
//! ## Providers
//!
//! - [`DirectoryProvider`] - Storage port
//! - [`InMemoryDirectory`] - In-process implementation for development and tests
//!
//! The PostgreSQL implementation lives in `ox-storage-sql`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod directory;
pub mod entry;
pub mod error;
pub mod memory;

pub use directory::DirectoryProvider;
pub use entry::SessionEntry;
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryDirectory;

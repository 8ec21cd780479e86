//! Storage error types.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Entry not found.
    #[error("Entry not found: {dn}")]
    NotFound {
        /// DN of the missing entry.
        dn: String,
    },

    /// Entry already exists.
    #[error("Entry already exists: {dn}")]
    AlreadyExists {
        /// DN of the existing entry.
        dn: String,
    },

    /// Concurrent modification detected; the write was based on a stale version.
    #[error("Concurrent modification of {dn}: expected version {expected}, found {actual}")]
    Conflict {
        /// DN of the contended entry.
        dn: String,
        /// Version the writer based its change on.
        expected: i64,
        /// Version currently stored.
        actual: i64,
    },

    /// Invalid data.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Backend connection error.
    #[error("Storage connection error: {0}")]
    Connection(String),

    /// Query error.
    #[error("Storage query error: {0}")]
    Query(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error.
    #[error("Internal storage error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Creates a not found error.
    #[must_use]
    pub fn not_found(dn: impl Into<String>) -> Self {
        Self::NotFound { dn: dn.into() }
    }

    /// Creates an already exists error.
    #[must_use]
    pub fn already_exists(dn: impl Into<String>) -> Self {
        Self::AlreadyExists { dn: dn.into() }
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(dn: impl Into<String>, expected: i64, actual: i64) -> Self {
        Self::Conflict {
            dn: dn.into(),
            expected,
            actual,
        }
    }

    /// Checks if this is a not found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Checks if this is a concurrent-modification conflict.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Checks if this is a duplicate entry error.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

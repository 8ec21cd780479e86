//! Cache error types.

use thiserror::Error;

/// Cache operation errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend could not be reached.
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    /// A value could not be encoded or decoded.
    #[error("cached value codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The operation did not complete in time.
    #[error("cache operation timed out")]
    Timeout,

    /// The backend configuration is invalid.
    #[error("invalid cache configuration: {0}")]
    Configuration(String),

    /// Any other backend failure.
    #[error("cache backend error: {0}")]
    Backend(String),
}

impl CacheError {
    /// Returns whether retrying the operation may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout)
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

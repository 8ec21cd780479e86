//! Cache provider trait.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::CacheResult;

/// Cache provider trait for key-value caching.
///
/// Implementations must be thread-safe and support concurrent access.
/// The cache implementation is responsible for serialization.
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Gets a value from the cache.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    async fn get<T>(&self, key: &str) -> CacheResult<Option<T>>
    where
        T: DeserializeOwned + Send;

    /// Sets a value in the cache with optional TTL.
    ///
    /// If `ttl` is `None`, the value will not expire automatically.
    async fn set<T>(&self, key: &str, value: &T, ttl: Option<Duration>) -> CacheResult<()>
    where
        T: Serialize + Sync;

    /// Deletes a value from the cache.
    ///
    /// Returns `Ok(())` even if the key doesn't exist.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Checks if a key exists in the cache.
    async fn exists(&self, key: &str) -> CacheResult<bool>;
}

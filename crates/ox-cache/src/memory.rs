//! In-memory shared cache.
//!
//! Stand-in for the Redis provider in single-node deployments and tests.
//! Values are stored as JSON so the serialization contract matches Redis.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::CacheResult;
use crate::provider::CacheProvider;

#[derive(Debug)]
struct StoredValue {
    json: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-memory implementation of [`CacheProvider`].
#[derive(Debug, Default)]
pub struct InMemoryCacheProvider {
    values: DashMap<String, StoredValue>,
}

impl InMemoryCacheProvider {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheProvider for InMemoryCacheProvider {
    async fn get<T>(&self, key: &str) -> CacheResult<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        let now = Instant::now();
        let live = self
            .values
            .get(key)
            .map(|stored| stored.is_live(now).then(|| stored.json.clone()));

        match live {
            Some(Some(json)) => Ok(Some(serde_json::from_str(&json)?)),
            Some(None) => {
                // Expired.
                self.values.remove_if(key, |_, stored| !stored.is_live(now));
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set<T>(&self, key: &str, value: &T, ttl: Option<Duration>) -> CacheResult<()>
    where
        T: Serialize + Sync,
    {
        let json = serde_json::to_string(value)?;
        self.values.insert(
            key.to_string(),
            StoredValue {
                json,
                expires_at: ttl.map(|ttl| Instant::now() + ttl.max(Duration::from_secs(1))),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.values.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let now = Instant::now();
        Ok(self
            .values
            .get(key)
            .is_some_and(|stored| stored.is_live(now)))
    }
}

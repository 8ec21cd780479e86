//! Redis cache provider implementation.

use std::time::Duration;

use async_trait::async_trait;
use fred::prelude::*;
use ox_cache::{CacheError, CacheProvider, CacheResult};
use serde::{Serialize, de::DeserializeOwned};

use crate::config::RedisConfig;
use crate::error::from_redis_error;

/// Redis-based shared cache provider.
pub struct RedisCacheProvider {
    client: Client,
    config: RedisConfig,
}

impl RedisCacheProvider {
    /// Creates a new Redis cache provider and connects it.
    ///
    /// ## Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn new(config: RedisConfig) -> CacheResult<Self> {
        let redis_config = Config::from_url(&config.connection_url())
            .map_err(|e| CacheError::Configuration(e.to_string()))?;

        let client = Client::new(
            redis_config,
            None,
            None,
            Some(ReconnectPolicy::new_exponential(0, 1000, 30_000, 2)),
        );

        client.init().await.map_err(from_redis_error)?;
        tracing::info!(endpoint = %config.endpoint, database = config.database, "Connected to Redis");

        Ok(Self { client, config })
    }

    /// Returns the underlying Redis client.
    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    fn key(&self, dn: &str) -> String {
        self.config.session_key(dn)
    }
}

fn expiration(ttl: Duration) -> Expiration {
    Expiration::EX(i64::try_from(ttl.as_secs().max(1)).unwrap_or(i64::MAX))
}

#[async_trait]
impl CacheProvider for RedisCacheProvider {
    async fn get<T>(&self, key: &str) -> CacheResult<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        let key = self.key(key);
        let value: Option<String> = self.client.get(&key).await.map_err(from_redis_error)?;

        value
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(CacheError::from)
    }

    async fn set<T>(&self, key: &str, value: &T, ttl: Option<Duration>) -> CacheResult<()>
    where
        T: Serialize + Sync,
    {
        let key = self.key(key);
        let serialized = serde_json::to_string(value)?;
        let expiration = ttl.map(expiration);

        self.client
            .set::<(), _, _>(&key, serialized, expiration, None, false)
            .await
            .map_err(from_redis_error)
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let key = self.key(key);
        self.client
            .del::<(), _>(&key)
            .await
            .map_err(from_redis_error)
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let key = self.key(key);
        let count: i64 = self.client.exists(&key).await.map_err(from_redis_error)?;
        Ok(count > 0)
    }
}

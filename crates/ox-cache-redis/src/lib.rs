//! # ox-cache-redis
//!
//! Redis cache implementation for the session core.
//!
//! This crate provides the shared cache tier using the `fred` crate,
//! implementing [`ox_cache::CacheProvider`]. Session entries are keyed by
//! their directory key and expire with the session TTL.
//!
//! ## Example
//!
//! ```ignore
//! use ox_cache_redis::{RedisCacheProvider, RedisConfig};
//! use ox_cache::CacheProvider;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RedisConfig::from_env();
//!
//!     let cache = RedisCacheProvider::new(config).await?;
//!     cache.set("oxId=abc,ou=sessions,o=jans", &entry, Some(Duration::from_secs(3600))).await?;
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod provider;

pub use config::RedisConfig;
pub use provider::RedisCacheProvider;

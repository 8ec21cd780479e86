//! # ox-cache
//!
//! Cache abstractions for the session core.
//!
//! ## Tiers
//!
//! - [`CacheProvider`] - Shared, TTL-bounded key-value cache. The production
//!   implementation is Redis-based (see `ox-cache-redis`);
//!   [`InMemoryCacheProvider`] serves single-node deployments and tests.
//! - [`LocalCache`] - Process-local accelerator with a short absolute TTL.
//!   Never authoritative.
//!
//! ## Example
//!
//! ```ignore
//! use ox_cache::{CacheProvider, CacheResult};
//! use std::time::Duration;
//!
//! async fn cache_entry(cache: &impl CacheProvider, dn: &str, data: &Entry) -> CacheResult<()> {
//!     cache.set(dn, data, Some(Duration::from_secs(3600))).await
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod local;
pub mod memory;
pub mod provider;

pub use error::{CacheError, CacheResult};
pub use local::LocalCache;
pub use memory::InMemoryCacheProvider;
pub use provider::CacheProvider;

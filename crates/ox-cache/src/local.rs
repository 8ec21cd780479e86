//! Process-local cache.
//!
//! A best-effort accelerator in front of the shared cache or directory
//! store. Entries expire after a short absolute TTL and are never treated as
//! authoritative: callers re-validate whatever they read. Expired entries
//! are evicted when read and swept every [`PURGE_INTERVAL`] writes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Default lifetime of local cache entries (2 minutes).
pub const DEFAULT_LOCAL_TTL: Duration = Duration::from_secs(120);

/// Number of writes between sweeps of expired entries.
pub const PURGE_INTERVAL: usize = 64;

#[derive(Debug, Clone)]
struct LocalEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Concurrent in-process cache with per-entry absolute expiry.
#[derive(Debug)]
pub struct LocalCache<V> {
    entries: DashMap<String, LocalEntry<V>>,
    ttl: Duration,
    writes: AtomicUsize,
}

impl<V: Clone> LocalCache<V> {
    /// Creates a cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            writes: AtomicUsize::new(0),
        }
    }

    /// Returns the configured entry lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Gets a clone of the value if present and not expired.
    ///
    /// Expired entries are evicted on access.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Some(entry.value.clone());
            }
        }
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        None
    }

    /// Inserts a value with the default lifetime.
    pub fn put(&self, key: impl Into<String>, value: V) {
        self.put_with_ttl(key, value, self.ttl);
    }

    /// Inserts a value with an explicit lifetime.
    pub fn put_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.entries.insert(
            key.into(),
            LocalEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );

        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % PURGE_INTERVAL == 0 {
            let purged = self.purge_expired();
            if purged > 0 {
                tracing::trace!(purged, remaining = self.entries.len(), "Local cache swept");
            }
        }
    }

    /// Removes a value.
    pub fn remove(&self, key: &str) -> Option<V> {
        self.entries.remove(key).map(|(_, entry)| entry.value)
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    /// Number of entries, including expired ones not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> Default for LocalCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_LOCAL_TTL)
    }
}

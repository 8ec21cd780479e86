//! In-memory directory provider.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::directory::DirectoryProvider;
use crate::entry::SessionEntry;
use crate::error::{StorageError, StorageResult};

/// In-memory implementation of [`DirectoryProvider`].
///
/// Versions behave like the SQL provider: persist stores version 1 and
/// every successful merge increments it.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    entries: RwLock<HashMap<String, SessionEntry>>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns whether the directory is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl DirectoryProvider for InMemoryDirectory {
    async fn persist(&self, entry: &SessionEntry) -> StorageResult<()> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&entry.dn) {
            return Err(StorageError::already_exists(&entry.dn));
        }

        let mut stored = entry.clone();
        stored.version = 1;
        entries.insert(stored.dn.clone(), stored);
        Ok(())
    }

    async fn find(&self, dn: &str) -> StorageResult<Option<SessionEntry>> {
        Ok(self.entries.read().await.get(dn).cloned())
    }

    async fn merge(&self, entry: &SessionEntry) -> StorageResult<i64> {
        let mut entries = self.entries.write().await;
        let stored = entries
            .get_mut(&entry.dn)
            .ok_or_else(|| StorageError::not_found(&entry.dn))?;

        if stored.version != entry.version {
            return Err(StorageError::conflict(
                &entry.dn,
                entry.version,
                stored.version,
            ));
        }

        let version = stored.version + 1;
        *stored = entry.clone();
        stored.version = version;
        Ok(version)
    }

    async fn remove(&self, dn: &str) -> StorageResult<bool> {
        Ok(self.entries.write().await.remove(dn).is_some())
    }

    async fn find_by_user(&self, base_dn: &str, user_dn: &str) -> StorageResult<Vec<SessionEntry>> {
        let suffix = format!(",{base_dn}");
        Ok(self
            .entries
            .read()
            .await
            .values()
            .filter(|entry| entry.dn.ends_with(&suffix) && entry.belongs_to(user_dn))
            .cloned()
            .collect())
    }
}

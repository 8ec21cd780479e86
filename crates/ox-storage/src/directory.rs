//! Directory storage port.

use async_trait::async_trait;

use crate::entry::SessionEntry;
use crate::error::StorageResult;

/// Durable, directory-style session storage.
///
/// Implementations may use an LDAP directory, a relational database, or
/// in-memory storage depending on deployment requirements.
#[async_trait]
pub trait DirectoryProvider: Send + Sync {
    /// Writes a new entry with version 1.
    ///
    /// Fails with `AlreadyExists` if the DN is taken.
    async fn persist(&self, entry: &SessionEntry) -> StorageResult<()>;

    /// Finds an entry by DN.
    async fn find(&self, dn: &str) -> StorageResult<Option<SessionEntry>>;

    /// Replaces an entry if its stored version equals `entry.version`.
    ///
    /// Returns the new version. Fails with `Conflict` when the stored
    /// version differs and `NotFound` when the entry is gone.
    async fn merge(&self, entry: &SessionEntry) -> StorageResult<i64>;

    /// Removes an entry. Returns whether an entry was removed.
    async fn remove(&self, dn: &str) -> StorageResult<bool>;

    /// Finds all entries under `base_dn` owned by `user_dn`.
    async fn find_by_user(&self, base_dn: &str, user_dn: &str) -> StorageResult<Vec<SessionEntry>>;
}

//! Session storage port.
//!
//! Exactly one backend is active per deployment: the shared cache
//! ([`CacheSessionStore`]) or the durable directory
//! ([`DirectorySessionStore`]). Both classify backend failures into
//! [`StoreError`] so the orchestrator never inspects backend errors.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ox_cache::{CacheError, CacheProvider};
use ox_storage::{DirectoryProvider, SessionEntry, StorageError};
use thiserror::Error;

use crate::model::{SessionId, SessionIdState};

/// Classified storage failure.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A concurrent writer changed the entry; the write may be retried.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The entry does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend does not support the operation.
    #[error("operation not supported by the {0} backend")]
    Unsupported(&'static str),

    /// Any other backend failure.
    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// Checks if the failure is a retryable write conflict.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<StorageError> for StoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict { .. } => Self::Conflict(err.to_string()),
            StorageError::NotFound { dn } => Self::NotFound(dn),
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<CacheError> for StoreError {
    fn from(err: CacheError) -> Self {
        Self::Other(err.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage port for sessions, keyed by directory key.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Reads a session.
    async fn get(&self, dn: &str) -> StoreResult<Option<SessionId>>;

    /// Writes a new session.
    async fn persist(&self, session: &mut SessionId) -> StoreResult<()>;

    /// Writes back a changed session.
    ///
    /// On [`StoreError::Conflict`] the session is left ready for another
    /// attempt.
    async fn merge(&self, session: &mut SessionId) -> StoreResult<()>;

    /// Removes a session.
    async fn remove(&self, dn: &str) -> StoreResult<()>;

    /// Lists the sessions of a subject.
    async fn find_by_user(&self, user_dn: &str) -> StoreResult<Vec<SessionId>>;
}

/// [`SessionStore`] over a shared TTL cache.
///
/// Entries expire with the session's `ttl`. A non-positive `ttl` (a
/// disabled threshold) stores the entry without expiry.
pub struct CacheSessionStore<C> {
    cache: Arc<C>,
}

impl<C> CacheSessionStore<C> {
    /// Creates a store over `cache`.
    #[must_use]
    pub const fn new(cache: Arc<C>) -> Self {
        Self { cache }
    }
}

impl<C: CacheProvider> CacheSessionStore<C> {
    async fn put(&self, session: &SessionId) -> StoreResult<()> {
        let ttl = u64::try_from(session.ttl)
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        self.cache
            .set(session.dn(), session, ttl)
            .await
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl<C: CacheProvider + 'static> SessionStore for CacheSessionStore<C> {
    fn name(&self) -> &'static str {
        "cache"
    }

    async fn get(&self, dn: &str) -> StoreResult<Option<SessionId>> {
        Ok(self.cache.get(dn).await?)
    }

    async fn persist(&self, session: &mut SessionId) -> StoreResult<()> {
        self.put(session).await
    }

    async fn merge(&self, session: &mut SessionId) -> StoreResult<()> {
        self.put(session).await
    }

    async fn remove(&self, dn: &str) -> StoreResult<()> {
        Ok(self.cache.delete(dn).await?)
    }

    async fn find_by_user(&self, _user_dn: &str) -> StoreResult<Vec<SessionId>> {
        Err(StoreError::Unsupported(self.name()))
    }
}

/// [`SessionStore`] over a durable directory with optimistic versioning.
pub struct DirectorySessionStore<D> {
    directory: Arc<D>,
    base_dn: String,
}

impl<D> DirectorySessionStore<D> {
    /// Creates a store over `directory` for sessions under `base_dn`.
    #[must_use]
    pub fn new(directory: Arc<D>, base_dn: impl Into<String>) -> Self {
        Self {
            directory,
            base_dn: base_dn.into(),
        }
    }
}

#[async_trait]
impl<D: DirectoryProvider + 'static> SessionStore for DirectorySessionStore<D> {
    fn name(&self) -> &'static str {
        "directory"
    }

    async fn get(&self, dn: &str) -> StoreResult<Option<SessionId>> {
        self.directory
            .find(dn)
            .await?
            .map(SessionId::try_from)
            .transpose()
    }

    async fn persist(&self, session: &mut SessionId) -> StoreResult<()> {
        self.directory.persist(&SessionEntry::from(&*session)).await?;
        session.set_version(1);
        Ok(())
    }

    async fn merge(&self, session: &mut SessionId) -> StoreResult<()> {
        if session.version() == 0 {
            return self.persist(session).await;
        }

        match self.directory.merge(&SessionEntry::from(&*session)).await {
            Ok(version) => {
                session.set_version(version);
                Ok(())
            }
            Err(StorageError::Conflict {
                dn,
                expected,
                actual,
            }) => {
                // Rebase on the stored version for the next attempt.
                session.set_version(actual);
                Err(StoreError::Conflict(format!(
                    "{dn}: expected version {expected}, found {actual}"
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, dn: &str) -> StoreResult<()> {
        self.directory.remove(dn).await?;
        Ok(())
    }

    async fn find_by_user(&self, user_dn: &str) -> StoreResult<Vec<SessionId>> {
        self.directory
            .find_by_user(&self.base_dn, user_dn)
            .await?
            .into_iter()
            .map(SessionId::try_from)
            .collect()
    }
}

impl From<&SessionId> for SessionEntry {
    fn from(session: &SessionId) -> Self {
        Self {
            dn: session.dn().to_string(),
            id: session.id().to_string(),
            outside_id: session.outside_id.clone(),
            user_dn: session.user_dn.clone(),
            state: session.state.as_str().to_string(),
            session_state: session.session_state.clone(),
            ttl: session.ttl,
            expiration_date: session.expiration_date,
            creation_date: session.creation_date,
            authentication_time: session.authentication_time,
            last_used_at: session.last_used_at,
            is_jwt: session.is_jwt,
            jwt: session.jwt.clone(),
            session_attributes: session.attributes_snapshot(),
            permission_granted_map: session.permission_granted_map.clone(),
            version: session.version(),
        }
    }
}

impl TryFrom<SessionEntry> for SessionId {
    type Error = StoreError;

    fn try_from(entry: SessionEntry) -> Result<Self, Self::Error> {
        let state = SessionIdState::parse(&entry.state).ok_or_else(|| {
            StoreError::Other(format!("{}: unknown session state '{}'", entry.dn, entry.state))
        })?;

        let base_dn = entry
            .dn
            .strip_prefix(&format!("oxId={},", entry.id))
            .ok_or_else(|| {
                StoreError::Other(format!("{}: key does not match id {}", entry.dn, entry.id))
            })?
            .to_string();

        let mut session = Self::new(entry.id, entry.outside_id, &base_dn);
        session.user_dn = entry.user_dn;
        session.state = state;
        session.session_state = entry.session_state;
        session.set_attributes(entry.session_attributes);
        session.creation_date = entry.creation_date;
        session.authentication_time = entry.authentication_time;
        session.last_used_at = entry.last_used_at;
        session.expiration_date = entry.expiration_date;
        session.ttl = entry.ttl;
        session.persisted = true;
        session.is_jwt = entry.is_jwt;
        session.jwt = entry.jwt;
        session.permission_granted_map = entry.permission_granted_map;
        session.set_version(entry.version);
        Ok(session)
    }
}

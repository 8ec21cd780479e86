//! Connection pool for the session directory.

use std::time::Duration;

use ox_storage::StorageError;
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Pool settings for the session table.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Database URL.
    pub url: String,
    /// Upper bound on open connections.
    pub max_connections: u32,
    /// Connections kept open while idle.
    pub min_connections: u32,
    /// How long a caller waits for a free connection.
    pub acquire_timeout: Duration,
    /// Connections are recycled after this age.
    pub max_lifetime: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/ox".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

impl PoolConfig {
    /// Creates a configuration for `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Reads `OX_DATABASE_URL` and `OX_DATABASE_MAX_CONNECTIONS`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] if the URL is unset.
    pub fn from_env() -> Result<Self, StorageError> {
        let url = std::env::var("OX_DATABASE_URL")
            .map_err(|_| StorageError::Connection("OX_DATABASE_URL is not set".to_string()))?;
        let mut config = Self::new(url);
        if let Some(max) = std::env::var("OX_DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|max| max.parse().ok())
        {
            config.max_connections = max;
        }
        Ok(config)
    }

    /// Sets the connection bounds.
    #[must_use]
    pub const fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        if self.min_connections > max {
            self.min_connections = max;
        }
        self
    }

    /// Sets how long a caller waits for a connection.
    #[must_use]
    pub const fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Sets the connection recycle age.
    #[must_use]
    pub const fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }
}

/// Opens a pool.
///
/// # Errors
///
/// Returns [`StorageError::Connection`] if the database is unreachable.
pub async fn create_pool(config: &PoolConfig) -> Result<PgPool, StorageError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .max_lifetime(Some(config.max_lifetime))
        .connect(&config.url)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

    tracing::debug!(max_connections = config.max_connections, "Session directory pool opened");
    Ok(pool)
}

/// Applies the bundled `ox_sessions` schema.
///
/// # Errors
///
/// Returns an error if a migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StorageError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| StorageError::Internal(format!("session schema migration failed: {e}")))?;
    tracing::info!("Session schema migrations applied");
    Ok(())
}

//! `PostgreSQL` implementation of the directory provider.

use async_trait::async_trait;
use ox_storage::error::StorageResult;
use ox_storage::{DirectoryProvider, SessionEntry, StorageError};
use sqlx::PgPool;
use sqlx::types::Json;

use crate::entities::SessionRow;
use crate::error::{from_insert_error, from_sqlx_error};

/// `PostgreSQL` session directory provider.
pub struct PgDirectoryProvider {
    pool: PgPool,
}

impl PgDirectoryProvider {
    /// Creates a new `PostgreSQL` directory provider.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn current_version(&self, dn: &str) -> StorageResult<Option<i64>> {
        sqlx::query_scalar("SELECT version FROM ox_sessions WHERE dn = $1")
            .bind(dn)
            .fetch_optional(&self.pool)
            .await
            .map_err(from_sqlx_error)
    }
}

#[async_trait]
impl DirectoryProvider for PgDirectoryProvider {
    async fn persist(&self, entry: &SessionEntry) -> StorageResult<()> {
        sqlx::query(
            r"INSERT INTO ox_sessions (
                dn, id, outside_id, user_dn, state, session_state, ttl,
                expiration_date, creation_date, authentication_time, last_used_at,
                is_jwt, jwt, session_attributes, permission_granted_map, version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, 1)",
        )
        .bind(&entry.dn)
        .bind(&entry.id)
        .bind(&entry.outside_id)
        .bind(&entry.user_dn)
        .bind(&entry.state)
        .bind(&entry.session_state)
        .bind(entry.ttl)
        .bind(entry.expiration_date)
        .bind(entry.creation_date)
        .bind(entry.authentication_time)
        .bind(entry.last_used_at)
        .bind(entry.is_jwt)
        .bind(&entry.jwt)
        .bind(Json(&entry.session_attributes))
        .bind(Json(&entry.permission_granted_map))
        .execute(&self.pool)
        .await
        .map_err(|e| from_insert_error(e, &entry.dn))?;

        Ok(())
    }

    async fn find(&self, dn: &str) -> StorageResult<Option<SessionEntry>> {
        let row: Option<SessionRow> = sqlx::query_as("SELECT * FROM ox_sessions WHERE dn = $1")
            .bind(dn)
            .fetch_optional(&self.pool)
            .await
            .map_err(from_sqlx_error)?;

        Ok(row.map(SessionEntry::from))
    }

    async fn merge(&self, entry: &SessionEntry) -> StorageResult<i64> {
        let version: Option<i64> = sqlx::query_scalar(
            r"UPDATE ox_sessions SET
                id = $3, outside_id = $4, user_dn = $5, state = $6, session_state = $7,
                ttl = $8, expiration_date = $9, authentication_time = $10,
                last_used_at = $11, is_jwt = $12, jwt = $13,
                session_attributes = $14, permission_granted_map = $15,
                version = version + 1
            WHERE dn = $1 AND version = $2
            RETURNING version",
        )
        .bind(&entry.dn)
        .bind(entry.version)
        .bind(&entry.id)
        .bind(&entry.outside_id)
        .bind(&entry.user_dn)
        .bind(&entry.state)
        .bind(&entry.session_state)
        .bind(entry.ttl)
        .bind(entry.expiration_date)
        .bind(entry.authentication_time)
        .bind(entry.last_used_at)
        .bind(entry.is_jwt)
        .bind(&entry.jwt)
        .bind(Json(&entry.session_attributes))
        .bind(Json(&entry.permission_granted_map))
        .fetch_optional(&self.pool)
        .await
        .map_err(from_sqlx_error)?;

        if let Some(version) = version {
            return Ok(version);
        }

        match self.current_version(&entry.dn).await? {
            Some(actual) => {
                tracing::debug!(dn = %entry.dn, expected = entry.version, actual, "Stale session merge");
                Err(StorageError::conflict(&entry.dn, entry.version, actual))
            }
            None => Err(StorageError::not_found(&entry.dn)),
        }
    }

    async fn remove(&self, dn: &str) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM ox_sessions WHERE dn = $1")
            .bind(dn)
            .execute(&self.pool)
            .await
            .map_err(from_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_user(&self, base_dn: &str, user_dn: &str) -> StorageResult<Vec<SessionEntry>> {
        let rows: Vec<SessionRow> = sqlx::query_as(
            r"SELECT * FROM ox_sessions
            WHERE user_dn = $1 AND right(dn, length($2) + 1) = ',' || $2
            ORDER BY creation_date",
        )
        .bind(user_dn)
        .bind(base_dn)
        .fetch_all(&self.pool)
        .await
        .map_err(from_sqlx_error)?;

        Ok(rows.into_iter().map(SessionEntry::from).collect())
    }
}

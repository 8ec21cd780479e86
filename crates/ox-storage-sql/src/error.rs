//! SQL storage error types.

use ox_storage::StorageError;
use sqlx::Error as SqlxError;

/// Converts a `SQLx` error to a storage error.
#[allow(clippy::needless_pass_by_value)]
pub fn from_sqlx_error(err: SqlxError) -> StorageError {
    match err {
        SqlxError::RowNotFound => StorageError::Internal("Row not found".to_string()),
        SqlxError::Database(db_err) => StorageError::Query(db_err.to_string()),
        SqlxError::ColumnDecode { .. } | SqlxError::Decode(_) => {
            StorageError::Serialization(err.to_string())
        }
        SqlxError::PoolTimedOut => StorageError::Connection("Connection pool timeout".to_string()),
        SqlxError::PoolClosed => StorageError::Connection("Connection pool closed".to_string()),
        SqlxError::Io(_) | SqlxError::Tls(_) => StorageError::Connection(err.to_string()),
        _ => StorageError::Internal(err.to_string()),
    }
}

/// Converts an insert error, mapping unique violations on `dn` to
/// [`StorageError::AlreadyExists`].
pub fn from_insert_error(err: SqlxError, dn: &str) -> StorageError {
    // PostgreSQL unique_violation
    if let SqlxError::Database(db_err) = &err {
        if db_err.code().is_some_and(|c| c == "23505") {
            return StorageError::already_exists(dn);
        }
    }
    from_sqlx_error(err)
}

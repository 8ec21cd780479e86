//! Redis error classification.

use fred::error::{Error as RedisError, ErrorKind};
use ox_cache::CacheError;

/// Classifies a `fred` error.
///
/// Transport failures map to [`CacheError::Unavailable`] so callers can tell
/// them apart from rejected commands.
#[allow(clippy::needless_pass_by_value)]
pub fn from_redis_error(err: RedisError) -> CacheError {
    let message = err.details().to_string();
    match err.kind() {
        ErrorKind::IO | ErrorKind::Canceled => CacheError::Unavailable(message),
        ErrorKind::Timeout => CacheError::Timeout,
        ErrorKind::Config | ErrorKind::Url | ErrorKind::Auth | ErrorKind::Tls => {
            CacheError::Configuration(message)
        }
        _ => CacheError::Backend(message),
    }
}

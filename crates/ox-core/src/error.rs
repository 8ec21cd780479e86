//! Configuration errors.
//!
//! Messages name the offending setting but never echo secrets.

use thiserror::Error;

/// Result type alias using the core error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while assembling the session configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// An environment variable is set but cannot be parsed.
    #[error("{name} has an invalid value: {value}")]
    InvalidSetting {
        /// Variable name.
        name: String,
        /// Raw value.
        value: String,
    },

    /// The combined settings are inconsistent.
    #[error("configuration error: {0}")]
    Config(String),
}

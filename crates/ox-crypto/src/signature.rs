//! Signature errors.

use thiserror::Error;

/// Error type for signature operations.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Invalid key format.
    #[error("invalid key format: {0}")]
    InvalidKey(String),

    /// Algorithm not supported.
    #[error("algorithm not supported: {0}")]
    UnsupportedAlgorithm(String),

    /// No active signing key is configured.
    #[error("no active signing key")]
    NoActiveKey,
}

//! Signature algorithm definitions.
//!
//! Session snapshots are signed with an asymmetric algorithm; `RS512` is the
//! default. Symmetric and SHA-256 based algorithms are rejected.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for algorithm operations.
#[derive(Debug, Error)]
pub enum AlgorithmError {
    /// Algorithm is recognised but not accepted for session signing.
    #[error("algorithm '{0}' is not accepted for session signing")]
    NotAccepted(String),

    /// Unknown algorithm.
    #[error("unknown algorithm: {0}")]
    Unknown(String),
}

/// Asymmetric signature algorithms accepted for session snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// ECDSA using P-384 curve and SHA-384 hash.
    #[serde(rename = "ES384")]
    Es384,

    /// RSA PKCS#1 v1.5 with SHA-384.
    #[serde(rename = "RS384")]
    Rs384,

    /// RSA PKCS#1 v1.5 with SHA-512.
    #[default]
    #[serde(rename = "RS512")]
    Rs512,

    /// RSA-PSS with SHA-384.
    #[serde(rename = "PS384")]
    Ps384,

    /// RSA-PSS with SHA-512.
    #[serde(rename = "PS512")]
    Ps512,
}

impl SignatureAlgorithm {
    /// Returns the JWA algorithm name.
    #[must_use]
    pub const fn jwa_name(self) -> &'static str {
        match self {
            Self::Es384 => "ES384",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
            Self::Ps384 => "PS384",
            Self::Ps512 => "PS512",
        }
    }

    /// Returns whether this is an ECDSA algorithm.
    #[must_use]
    pub const fn is_ecdsa(self) -> bool {
        matches!(self, Self::Es384)
    }

    /// Returns whether this is an RSA algorithm.
    #[must_use]
    pub const fn is_rsa(self) -> bool {
        matches!(self, Self::Rs384 | Self::Rs512 | Self::Ps384 | Self::Ps512)
    }

    /// Parses a JWA algorithm name.
    ///
    /// ## Errors
    ///
    /// Returns an error if the algorithm is symmetric, SHA-256 based, or unknown.
    pub fn from_jwa(name: &str) -> Result<Self, AlgorithmError> {
        match name {
            "ES384" => Ok(Self::Es384),
            "RS384" => Ok(Self::Rs384),
            "RS512" => Ok(Self::Rs512),
            "PS384" => Ok(Self::Ps384),
            "PS512" => Ok(Self::Ps512),

            "ES256" | "RS256" | "PS256" | "HS256" | "HS384" | "HS512" | "none" => {
                Err(AlgorithmError::NotAccepted(name.to_string()))
            }

            _ => Err(AlgorithmError::Unknown(name.to_string())),
        }
    }
}

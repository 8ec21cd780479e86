//! # ox-crypto
//!
//! Cryptographic primitives for the session core using aws-lc-rs.
//!
//! - [`hash`] - SHA-256 digest and hex encoding for `session_state`
//! - [`random`] - Random session identifiers, salts and browser-state tokens
//! - [`algorithm`] - Signature algorithms accepted for session snapshots
//! - [`signature`] - Signing errors

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod algorithm;
pub mod hash;
pub mod random;
pub mod signature;

pub use algorithm::{AlgorithmError, SignatureAlgorithm};
pub use hash::{sha256, sha256_hex, to_hex};
pub use signature::SignatureError;

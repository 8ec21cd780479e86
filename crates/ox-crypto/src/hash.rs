//! Hash functions.
//!
//! OIDC Session Management fixes the `session_state` digest to SHA-256, so
//! this module exposes SHA-256 for that protocol computation only.

use std::fmt::Write;

use aws_lc_rs::digest;

/// Computes a SHA-256 digest of the input data.
#[must_use]
pub fn sha256(data: &[u8]) -> Vec<u8> {
    digest::digest(&digest::SHA256, data).as_ref().to_vec()
}

/// Encodes bytes as lowercase hexadecimal.
#[must_use]
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Computes a SHA-256 digest and returns it as lowercase hex.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    to_hex(&sha256(data))
}

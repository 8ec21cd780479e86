//! Random identifiers.
//!
//! Session identifiers, outside identifiers, `session_state` salts and
//! browser-state tokens are all UUID v4 strings drawn from the OS RNG.

use uuid::Uuid;

/// Generates a session identifier.
#[must_use]
pub fn generate_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a salt for `session_state` computation.
#[must_use]
pub fn generate_salt() -> String {
    Uuid::new_v4().to_string()
}

/// Generates an OP browser state token.
#[must_use]
pub fn generate_browser_state() -> String {
    Uuid::new_v4().to_string()
}

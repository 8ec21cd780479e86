//! Persisted session record.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A session as stored in the directory.
///
/// Field names follow the directory attribute names (`outsideId`,
/// `userDn`, `sessionAttributes`, ...). `version` is maintained by the
/// provider and starts at 1 on first persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntry {
    /// Directory key, `oxId=<id>,<base-dn>`.
    pub dn: String,
    /// Internal session identifier.
    pub id: String,
    /// Externally exposed identifier.
    pub outside_id: String,
    /// DN of the authenticated subject.
    pub user_dn: Option<String>,
    /// Lifecycle state (`authenticated` / `unauthenticated`).
    pub state: String,
    /// OIDC `session_state`.
    pub session_state: Option<String>,
    /// Advisory TTL in seconds.
    pub ttl: i64,
    /// Authoritative expiration cutoff.
    pub expiration_date: DateTime<Utc>,
    /// Creation timestamp.
    pub creation_date: DateTime<Utc>,
    /// Time of the last successful authentication.
    pub authentication_time: Option<DateTime<Utc>>,
    /// Time of the last use.
    pub last_used_at: Option<DateTime<Utc>>,
    /// Whether a signed JWT snapshot is attached.
    pub is_jwt: bool,
    /// Signed JWT snapshot.
    pub jwt: Option<String>,
    /// Request context attributes.
    pub session_attributes: HashMap<String, String>,
    /// Consent grants per scope.
    pub permission_granted_map: HashMap<String, bool>,
    /// Optimistic concurrency version.
    #[serde(default)]
    pub version: i64,
}

impl SessionEntry {
    /// Returns the DN of the subject if the entry belongs to `user_dn`.
    #[must_use]
    pub fn belongs_to(&self, user_dn: &str) -> bool {
        self.user_dn.as_deref() == Some(user_dn)
    }
}

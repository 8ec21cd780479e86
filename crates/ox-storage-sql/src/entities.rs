//! Database row type for session entries.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use sqlx::types::Json;

/// Database row for `ox_sessions`.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub dn: String,
    pub id: String,
    pub outside_id: String,
    pub user_dn: Option<String>,
    pub state: String,
    pub session_state: Option<String>,
    pub ttl: i64,
    pub expiration_date: DateTime<Utc>,
    pub creation_date: DateTime<Utc>,
    pub authentication_time: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub is_jwt: bool,
    pub jwt: Option<String>,
    pub session_attributes: Json<HashMap<String, String>>,
    pub permission_granted_map: Json<HashMap<String, bool>>,
    pub version: i64,
}

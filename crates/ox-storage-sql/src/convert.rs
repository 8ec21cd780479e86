//! Conversion between database rows and session entries.

use ox_storage::SessionEntry;

use crate::entities::SessionRow;

impl From<SessionRow> for SessionEntry {
    fn from(row: SessionRow) -> Self {
        Self {
            dn: row.dn,
            id: row.id,
            outside_id: row.outside_id,
            user_dn: row.user_dn,
            state: row.state,
            session_state: row.session_state,
            ttl: row.ttl,
            expiration_date: row.expiration_date,
            creation_date: row.creation_date,
            authentication_time: row.authentication_time,
            last_used_at: row.last_used_at,
            is_jwt: row.is_jwt,
            jwt: row.jwt,
            session_attributes: row.session_attributes.0,
            permission_granted_map: row.permission_granted_map.0,
            version: row.version,
        }
    }
}

//! Audit records for session lifecycle transitions.
//!
//! Every record carries:
//! - Timestamp (ISO 8601)
//! - Lifecycle action
//! - Caller IP address (when a request context is available)
//! - Outcome (success/failure)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle action recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// A session reached the authenticated state.
    SessionAuthenticated,
    /// A session was created or reset in the unauthenticated state.
    SessionUnauthenticated,
}

/// Outcome of an audited operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    /// Operation succeeded.
    Success,
    /// Operation failed.
    Failure,
}

/// An append-only audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique record identifier.
    pub id: Uuid,

    /// Timestamp of the record.
    pub timestamp: DateTime<Utc>,

    /// Recorded action.
    pub action: AuditAction,

    /// Outcome of the action.
    pub outcome: AuditOutcome,

    /// Source IP address.
    pub ip_address: String,

    /// Client the session was bound to, if any.
    pub client_id: Option<String>,
}

impl AuditRecord {
    /// Creates a new record builder.
    #[must_use]
    pub fn builder(action: AuditAction, ip_address: impl Into<String>) -> AuditRecordBuilder {
        AuditRecordBuilder::new(action, ip_address)
    }

    /// Returns whether the audited operation succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, AuditOutcome::Success)
    }
}

/// Builder for audit records.
pub struct AuditRecordBuilder {
    action: AuditAction,
    outcome: AuditOutcome,
    ip_address: String,
    client_id: Option<String>,
}

impl AuditRecordBuilder {
    /// Creates a new builder; the outcome defaults to success.
    #[must_use]
    pub fn new(action: AuditAction, ip_address: impl Into<String>) -> Self {
        Self {
            action,
            outcome: AuditOutcome::Success,
            ip_address: ip_address.into(),
            client_id: None,
        }
    }

    /// Sets the outcome from a success flag.
    #[must_use]
    pub const fn success(mut self, success: bool) -> Self {
        self.outcome = if success {
            AuditOutcome::Success
        } else {
            AuditOutcome::Failure
        };
        self
    }

    /// Sets the client ID.
    #[must_use]
    pub fn client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Builds the record.
    #[must_use]
    pub fn build(self) -> AuditRecord {
        AuditRecord {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            action: self.action,
            outcome: self.outcome,
            ip_address: self.ip_address,
            client_id: self.client_id,
        }
    }
}

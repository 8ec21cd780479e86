//! Session lifecycle events and audit dispatch.
//!
//! Listeners and the audit sink are notified on spawned tasks. Their
//! failures are logged and never reach the operation that triggered them.
//! The one synchronous hook is [`SessionListener::start_session`], whose
//! veto forces the session back to unauthenticated.

use std::sync::Arc;

use async_trait::async_trait;
use ox_core::{AuditAction, AuditRecord};

use crate::context::RequestContext;
use crate::model::{SessionId, SessionIdState};

/// Lifecycle event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEventType {
    /// Session reached the authenticated state.
    Authenticated,
    /// Session was created or reset unauthenticated.
    Unauthenticated,
    /// Session was written back after a change.
    Updated,
    /// Session was removed.
    Gone,
}

/// A lifecycle event carrying a snapshot of the session.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    /// Event type.
    pub event_type: SessionEventType,
    /// Session snapshot.
    pub session: SessionId,
    /// Caller IP address, when the event came from a request.
    pub ip_address: Option<String>,
}

impl SessionEvent {
    /// Creates an event for `session`.
    #[must_use]
    pub fn new(event_type: SessionEventType, session: &SessionId) -> Self {
        Self {
            event_type,
            session: session.clone(),
            ip_address: None,
        }
    }

    /// Attaches request information.
    #[must_use]
    pub fn with_context(mut self, ctx: Option<&RequestContext>) -> Self {
        self.ip_address = ctx.and_then(|ctx| ctx.ip_address.clone());
        self
    }
}

/// External session lifecycle hook.
#[async_trait]
pub trait SessionListener: Send + Sync {
    /// Called before a session becomes authenticated. Returning `false`
    /// rejects the session.
    async fn start_session(&self, _session: &SessionId, _ctx: Option<&RequestContext>) -> bool {
        true
    }

    /// Called for every lifecycle event.
    ///
    /// # Errors
    ///
    /// Errors are logged by the dispatcher.
    async fn on_event(&self, event: &SessionEvent) -> Result<(), String>;
}

/// Append-only audit log.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Appends a record.
    ///
    /// # Errors
    ///
    /// Errors are logged by the dispatcher.
    async fn record(&self, record: AuditRecord) -> Result<(), String>;
}

/// [`AuditSink`] writing records to the `audit` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, record: AuditRecord) -> Result<(), String> {
        tracing::info!(
            target: "audit",
            id = %record.id,
            action = ?record.action,
            success = record.is_success(),
            ip_address = %record.ip_address,
            client_id = ?record.client_id,
            "Session audit"
        );
        Ok(())
    }
}

/// Fans events out to listeners and authentication transitions to the audit sink.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    listeners: Vec<Arc<dyn SessionListener>>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listeners.len())
            .field("audit", &self.audit.is_some())
            .finish()
    }
}

impl EventDispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(listeners: Vec<Arc<dyn SessionListener>>, audit: Option<Arc<dyn AuditSink>>) -> Self {
        Self { listeners, audit }
    }

    /// Asks every listener whether `session` may start.
    pub async fn start_session(&self, session: &SessionId, ctx: Option<&RequestContext>) -> bool {
        for listener in &self.listeners {
            if !listener.start_session(session, ctx).await {
                return false;
            }
        }
        true
    }

    /// Notifies listeners without waiting for them.
    pub fn dispatch(&self, event: SessionEvent) {
        if self.listeners.is_empty() {
            return;
        }

        let event = Arc::new(event);
        for listener in &self.listeners {
            let listener = Arc::clone(listener);
            let event = Arc::clone(&event);
            tokio::spawn(async move {
                if let Err(e) = listener.on_event(&event).await {
                    tracing::error!(
                        session_id = %event.session.id(),
                        event_type = ?event.event_type,
                        error = %e,
                        "Session listener failed"
                    );
                }
            });
        }
    }

    /// Records the session's state in the audit log.
    ///
    /// Only requests with a known caller produce a record.
    pub fn audit(&self, session: &SessionId, ctx: Option<&RequestContext>) {
        let (Some(sink), Some(ip)) = (
            self.audit.as_ref(),
            ctx.and_then(|ctx| ctx.ip_address.as_deref()),
        ) else {
            return;
        };

        let action = match session.state {
            SessionIdState::Authenticated => AuditAction::SessionAuthenticated,
            SessionIdState::Unauthenticated => AuditAction::SessionUnauthenticated,
        };
        let mut builder = AuditRecord::builder(action, ip).success(true);
        if let Some(client_id) = session.client_id() {
            builder = builder.client(client_id);
        }
        let record = builder.build();

        let sink = Arc::clone(sink);
        tokio::spawn(async move {
            if let Err(e) = sink.record(record).await {
                tracing::error!(error = %e, "Audit record dropped");
            }
        });
    }
}

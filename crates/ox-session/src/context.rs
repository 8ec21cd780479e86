//! Inbound request context.
//!
//! The transport layer hands the session core everything it needs from the
//! current request explicitly; nothing is looked up from ambient state.

use std::collections::HashMap;
use std::sync::Arc;

use crate::model::SessionId;

/// Receives a session whose identifier changed so the transport can set
/// the new session cookie.
pub trait SessionCookieWriter: Send + Sync {
    /// Writes the session cookie for `session`.
    fn write_session_cookie(&self, session: &SessionId);
}

/// Request data available to session operations.
#[derive(Clone, Default)]
pub struct RequestContext {
    /// Caller IP address.
    pub ip_address: Option<String>,
    /// Allowed request parameters.
    pub parameters: HashMap<String, String>,
    /// Cookie writer for identifier rotation.
    pub cookie_writer: Option<Arc<dyn SessionCookieWriter>>,
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("ip_address", &self.ip_address)
            .field("parameters", &self.parameters)
            .field("cookie_writer", &self.cookie_writer.is_some())
            .finish()
    }
}

impl RequestContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the caller IP address.
    #[must_use]
    pub fn with_ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    /// Sets a request parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Sets the cookie writer.
    #[must_use]
    pub fn with_cookie_writer(mut self, writer: Arc<dyn SessionCookieWriter>) -> Self {
        self.cookie_writer = Some(writer);
        self
    }
}

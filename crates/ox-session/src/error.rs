//! Session error types.

use ox_crypto::SignatureError;
use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Session not found.
    #[error("Session not found: {0}")]
    NotFound(String),

    /// Session expired.
    #[error("Session expired: {0}")]
    Expired(String),

    /// Concurrent writers kept conflicting until the merge attempts ran out.
    #[error("Session {id} still conflicting after {attempts} merge attempts: {last}")]
    Conflict {
        /// Session identifier.
        id: String,
        /// Number of merge attempts made.
        attempts: u32,
        /// Last conflict reported by the backend.
        last: String,
    },

    /// The session is not in a state that allows the operation, e.g. a
    /// session listener vetoed its start.
    #[error("Invalid session state: {0}")]
    InvalidSessionState(String),

    /// The requested ACR needs a stronger authentication than the session holds.
    #[error("Step-up authentication required: session acr '{session_acr}', requested '{requested}'")]
    StepUpRequired {
        /// ACR recorded on the session.
        session_acr: String,
        /// ACR requested by the caller.
        requested: String,
    },

    /// The requested authentication method is unknown or disabled.
    #[error("Requested acr is not available: {0}")]
    AcrUnavailable(String),

    /// Redirect URI could not be parsed into an origin.
    #[error("Invalid redirect_uri '{uri}': {reason}")]
    InvalidRedirectUri {
        /// Offending URI.
        uri: String,
        /// Parser message.
        reason: String,
    },

    /// Signing the session snapshot failed.
    #[error("Session signing failed: {0}")]
    Signing(#[from] SignatureError),

    /// Storage error.
    #[error("Session storage error: {0}")]
    Storage(StoreError),

    /// The service is missing a collaborator its configuration requires.
    #[error("Session configuration error: {0}")]
    Config(String),
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(dn) => Self::NotFound(dn),
            other => Self::Storage(other),
        }
    }
}

impl SessionError {
    /// Checks if this is a not found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Expired(_))
    }

    /// Checks if this is an ACR guard failure.
    #[must_use]
    pub const fn is_acr_failure(&self) -> bool {
        matches!(self, Self::StepUpRequired { .. } | Self::AcrUnavailable(_))
    }

    /// Checks if the caller should send the user back through login.
    ///
    /// Everything except signing, storage and configuration failures
    /// resolves by re-authenticating.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        !matches!(self, Self::Signing(_) | Self::Storage(_) | Self::Config(_))
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

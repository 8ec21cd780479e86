//! Session entity model.
//!
//! A [`SessionId`] binds a browser to a subject and to an in-progress or
//! completed authentication flow. Its directory key is always derived from
//! its identifier; the only way to change the identifier is
//! [`SessionId::rotate_id`], which recomputes the key.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionIdState {
    /// Authentication is in progress.
    #[default]
    Unauthenticated,
    /// A subject completed authentication.
    Authenticated,
}

impl SessionIdState {
    /// Returns the persisted value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticated => "authenticated",
        }
    }

    /// Parses a persisted value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unauthenticated" => Some(Self::Unauthenticated),
            "authenticated" => Some(Self::Authenticated),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionIdState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Well-known session attribute keys.
pub mod attrs {
    /// Client that started the flow.
    pub const CLIENT_ID: &str = "client_id";
    /// Redirect URI of the authorization request.
    pub const REDIRECT_URI: &str = "redirect_uri";
    /// ACR the session was authenticated with.
    pub const ACR: &str = "acr";
    /// ACR values requested by the client.
    pub const ACR_VALUES: &str = "acr_values";
    /// Current step of a multi-step login.
    pub const AUTH_STEP: &str = "auth_step";
    /// Prefix of the per-step completion markers.
    pub const AUTH_STEP_PASSED_PREFIX: &str = "auth_step_passed_";
    /// OP browser state.
    pub const OP_BROWSER_STATE: &str = "opbs";
    /// Space separated prompt values.
    pub const PROMPT: &str = "prompt";
    /// Marks a delegated (UMA) session that may authenticate without a subject.
    pub const UMA: &str = "uma";
    /// RP state parameter.
    pub const STATE: &str = "state";
    /// Identifier the session had before rotation.
    pub const OLD_SESSION_ID: &str = "old_session_id";
    /// Name of the authenticated user.
    pub const AUTHENTICATED_USER: &str = "auth_user";
}

/// Prompt values of an authorization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prompt {
    /// No user interaction allowed.
    None,
    /// Force re-authentication.
    Login,
    /// Force consent.
    Consent,
    /// Force account selection.
    SelectAccount,
}

impl Prompt {
    /// Parses a single prompt value.
    #[must_use]
    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::None),
            "login" => Some(Self::Login),
            "consent" => Some(Self::Consent),
            "select_account" => Some(Self::SelectAccount),
            _ => None,
        }
    }

    /// Parses a space separated prompt list, skipping unknown values.
    #[must_use]
    pub fn parse_list(value: &str) -> Vec<Self> {
        value.split_whitespace().filter_map(Self::from_param).collect()
    }
}

/// Builds the directory key for a session identifier.
#[must_use]
pub fn build_dn(id: &str, base_dn: &str) -> String {
    format!("oxId={id},{base_dn}")
}

/// A session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionId {
    id: String,
    dn: String,
    /// Externally exposed identifier.
    pub outside_id: String,
    /// DN of the authenticated subject.
    pub user_dn: Option<String>,
    /// Lifecycle state.
    pub state: SessionIdState,
    /// OIDC `session_state`.
    pub session_state: Option<String>,
    attributes: HashMap<String, String>,
    /// Creation timestamp.
    pub creation_date: DateTime<Utc>,
    /// Time of the last successful authentication.
    pub authentication_time: Option<DateTime<Utc>>,
    /// Time of the last use.
    pub last_used_at: Option<DateTime<Utc>>,
    /// Authoritative expiration cutoff.
    pub expiration_date: DateTime<Utc>,
    /// Advisory TTL in seconds.
    pub ttl: i64,
    /// Whether the session was written to its backend.
    #[serde(default)]
    pub persisted: bool,
    /// Whether a signed JWT snapshot is attached.
    pub is_jwt: bool,
    /// Signed JWT snapshot.
    pub jwt: Option<String>,
    /// Consent grants per scope.
    #[serde(default)]
    pub permission_granted_map: HashMap<String, bool>,
    #[serde(default)]
    version: i64,
}

impl SessionId {
    /// Creates an unauthenticated session under `base_dn`.
    #[must_use]
    pub fn new(id: impl Into<String>, outside_id: impl Into<String>, base_dn: &str) -> Self {
        let id = id.into();
        let now = Utc::now();
        Self {
            dn: build_dn(&id, base_dn),
            id,
            outside_id: outside_id.into(),
            user_dn: None,
            state: SessionIdState::Unauthenticated,
            session_state: None,
            attributes: HashMap::new(),
            creation_date: now,
            authentication_time: None,
            last_used_at: None,
            expiration_date: now,
            ttl: 0,
            persisted: false,
            is_jwt: false,
            jwt: None,
            permission_granted_map: HashMap::new(),
            version: 0,
        }
    }

    /// Returns the internal identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the directory key.
    #[must_use]
    pub fn dn(&self) -> &str {
        &self.dn
    }

    /// Returns the base DN the directory key lives under.
    #[must_use]
    pub fn base_dn(&self) -> &str {
        self.dn
            .strip_prefix("oxId=")
            .and_then(|rest| rest.strip_prefix(self.id.as_str()))
            .and_then(|rest| rest.strip_prefix(','))
            .unwrap_or_default()
    }

    /// Replaces the identifier and recomputes the directory key.
    ///
    /// Returns the previous identifier. The stored version is reset since
    /// the rotated session is a new entry.
    pub fn rotate_id(&mut self, new_id: impl Into<String>) -> String {
        let new_id = new_id.into();
        let dn = build_dn(&new_id, self.base_dn());
        self.dn = dn;
        self.version = 0;
        self.persisted = false;
        std::mem::replace(&mut self.id, new_id)
    }

    /// Returns the optimistic concurrency version seen by the last read or write.
    #[must_use]
    pub const fn version(&self) -> i64 {
        self.version
    }

    pub(crate) const fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    /// Returns whether the session is authenticated.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionIdState::Authenticated)
    }

    /// Returns the attributes.
    #[must_use]
    pub const fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    /// Returns an owned copy of the attributes.
    #[must_use]
    pub fn attributes_snapshot(&self) -> HashMap<String, String> {
        self.attributes.clone()
    }

    /// Replaces all attributes.
    pub fn set_attributes(&mut self, attributes: HashMap<String, String>) {
        self.attributes = attributes;
    }

    /// Returns an attribute value.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Sets an attribute.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Returns the bound client.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.attribute(attrs::CLIENT_ID)
    }

    /// Returns the bound redirect URI.
    #[must_use]
    pub fn redirect_uri(&self) -> Option<&str> {
        self.attribute(attrs::REDIRECT_URI)
    }

    /// Returns the OP browser state.
    #[must_use]
    pub fn op_browser_state(&self) -> Option<&str> {
        self.attribute(attrs::OP_BROWSER_STATE)
    }

    /// Returns the ACR the session was authenticated with, falling back to
    /// the requested `acr_values`.
    #[must_use]
    pub fn acr(&self) -> Option<&str> {
        self.attribute(attrs::ACR)
            .filter(|acr| !acr.trim().is_empty())
            .or_else(|| self.attribute(attrs::ACR_VALUES))
            .filter(|acr| !acr.trim().is_empty())
    }

    /// Returns the parsed `prompt` attribute.
    #[must_use]
    pub fn prompts(&self) -> Vec<Prompt> {
        self.attribute(attrs::PROMPT)
            .map(Prompt::parse_list)
            .unwrap_or_default()
    }

    /// Returns the current login step, defaulting to 1.
    #[must_use]
    pub fn current_auth_step(&self) -> u32 {
        self.attribute(attrs::AUTH_STEP)
            .and_then(|step| step.trim().parse().ok())
            .unwrap_or(1)
    }

    /// Marks the current step as passed, merges the step's attributes and
    /// moves to the next step.
    pub fn advance_auth_step(&mut self, attributes: HashMap<String, String>) {
        let step = self.current_auth_step();
        self.attributes.extend(attributes);
        self.attributes
            .insert(format!("{}{step}", attrs::AUTH_STEP_PASSED_PREFIX), "true".to_string());
        self.attributes
            .insert(attrs::AUTH_STEP.to_string(), (step + 1).to_string());
    }

    /// Rewinds a multi-step login to `step`.
    ///
    /// Clears the passed markers for `step..=current` and leaves earlier
    /// markers in place.
    pub fn reset_to_step(&mut self, step: u32) {
        let current = self.current_auth_step();
        for passed in step..=current {
            self.attributes
                .remove(&format!("{}{passed}", attrs::AUTH_STEP_PASSED_PREFIX));
        }
        self.attributes
            .insert(attrs::AUTH_STEP.to_string(), step.to_string());
    }

    /// Removes every `auth_step_passed_*` marker.
    pub fn clear_passed_steps(&mut self) {
        self.attributes
            .retain(|key, _| !key.starts_with(attrs::AUTH_STEP_PASSED_PREFIX));
    }

    /// Forces the session back to [`SessionIdState::Unauthenticated`].
    pub const fn force_unauthenticated(&mut self) {
        self.state = SessionIdState::Unauthenticated;
    }

    /// Records a consent decision for `scope`.
    pub fn grant_permission(&mut self, scope: impl Into<String>, granted: bool) {
        self.permission_granted_map.insert(scope.into(), granted);
    }

    /// Returns whether consent for `scope` was granted.
    #[must_use]
    pub fn is_permission_granted(&self, scope: &str) -> bool {
        self.permission_granted_map
            .get(scope)
            .copied()
            .unwrap_or(false)
    }
}

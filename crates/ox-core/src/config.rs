//! Session configuration.
//!
//! Supports loading from environment variables (with an optional `.env`
//! file) or deserializing from any `serde` source.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Sentinel value that disables an unused-lifetime check.
pub const LIFETIME_DISABLED: i64 = -1;

/// Lifetime used when neither session lifetime setting is configured.
pub const DEFAULT_SESSION_ID_LIFETIME: i64 = 86_400;

/// Settings that drive session persistence and expiration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Issuer identifier of this server; the origin fallback for `session_state`.
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Base DN under which session entries are keyed.
    #[serde(default = "default_sessions_base_dn")]
    pub sessions_base_dn: String,

    /// General session lifetime in seconds.
    #[serde(default)]
    pub session_id_lifetime: Option<i64>,

    /// Server-side session lifetime in seconds; takes precedence over
    /// `session_id_lifetime` when positive.
    #[serde(default)]
    pub server_session_id_lifetime: Option<i64>,

    /// Idle time in seconds after which a session is discarded.
    #[serde(default = "default_unused_lifetime")]
    pub session_id_unused_lifetime: i64,

    /// Idle time in seconds after which an unauthenticated session is discarded.
    #[serde(default = "default_unauthenticated_unused_lifetime")]
    pub session_id_unauthenticated_unused_lifetime: i64,

    /// Persist sessions created by `prompt=none` requests.
    #[serde(default = "default_true")]
    pub session_id_persist_on_prompt_none: bool,

    /// Store sessions in the shared cache instead of the directory store.
    #[serde(default)]
    pub session_id_persist_in_cache: bool,

    /// Attach a signed JWT snapshot to every session.
    #[serde(default)]
    pub session_as_jwt: bool,

    /// Rotate the session identifier when a session becomes authenticated.
    #[serde(default = "default_true")]
    pub change_session_id_on_authentication: bool,

    /// Lifetime of process-local cache entries in seconds.
    #[serde(default = "default_local_cache_ttl")]
    pub local_cache_ttl_secs: u64,

    /// Minimum age of `last_used_at` before a refresh is written back.
    #[serde(default = "default_debounce_ms")]
    pub last_used_at_debounce_ms: i64,

    /// Number of merge attempts before a write conflict is escalated.
    #[serde(default = "default_max_merge_attempts")]
    pub max_merge_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            sessions_base_dn: default_sessions_base_dn(),
            session_id_lifetime: None,
            server_session_id_lifetime: None,
            session_id_unused_lifetime: default_unused_lifetime(),
            session_id_unauthenticated_unused_lifetime: default_unauthenticated_unused_lifetime(),
            session_id_persist_on_prompt_none: true,
            session_id_persist_in_cache: false,
            session_as_jwt: false,
            change_session_id_on_authentication: true,
            local_cache_ttl_secs: default_local_cache_ttl(),
            last_used_at_debounce_ms: default_debounce_ms(),
            max_merge_attempts: default_max_merge_attempts(),
        }
    }
}

impl SessionConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from `OX_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSetting`] if a variable is set but cannot be
    /// parsed, and [`Error::Config`] if the merge attempt limit is zero.
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let mut config = Self::default();

        if let Ok(issuer) = std::env::var("OX_ISSUER") {
            config.issuer = issuer;
        }
        if let Ok(base_dn) = std::env::var("OX_SESSIONS_BASE_DN") {
            config.sessions_base_dn = base_dn;
        }
        if let Some(v) = env_parse("OX_SESSION_ID_LIFETIME")? {
            config.session_id_lifetime = Some(v);
        }
        if let Some(v) = env_parse("OX_SERVER_SESSION_ID_LIFETIME")? {
            config.server_session_id_lifetime = Some(v);
        }
        if let Some(v) = env_parse("OX_SESSION_ID_UNUSED_LIFETIME")? {
            config.session_id_unused_lifetime = v;
        }
        if let Some(v) = env_parse("OX_SESSION_ID_UNAUTHENTICATED_UNUSED_LIFETIME")? {
            config.session_id_unauthenticated_unused_lifetime = v;
        }
        if let Some(v) = env_parse("OX_SESSION_ID_PERSIST_ON_PROMPT_NONE")? {
            config.session_id_persist_on_prompt_none = v;
        }
        if let Some(v) = env_parse("OX_SESSION_ID_PERSIST_IN_CACHE")? {
            config.session_id_persist_in_cache = v;
        }
        if let Some(v) = env_parse("OX_SESSION_AS_JWT")? {
            config.session_as_jwt = v;
        }
        if let Some(v) = env_parse("OX_CHANGE_SESSION_ID_ON_AUTHENTICATION")? {
            config.change_session_id_on_authentication = v;
        }
        if let Some(v) = env_parse("OX_LOCAL_CACHE_TTL")? {
            config.local_cache_ttl_secs = v;
        }
        if let Some(v) = env_parse("OX_LAST_USED_AT_DEBOUNCE_MS")? {
            config.last_used_at_debounce_ms = v;
        }
        if let Some(v) = env_parse("OX_MAX_MERGE_ATTEMPTS")? {
            config.max_merge_attempts = v;
        }

        if config.max_merge_attempts == 0 {
            return Err(Error::Config(
                "OX_MAX_MERGE_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }

    /// Sets the issuer.
    #[must_use]
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Sets the sessions base DN.
    #[must_use]
    pub fn sessions_base_dn(mut self, base_dn: impl Into<String>) -> Self {
        self.sessions_base_dn = base_dn.into();
        self
    }

    /// Sets both lifetime settings.
    #[must_use]
    pub const fn lifetimes(mut self, server: Option<i64>, general: Option<i64>) -> Self {
        self.server_session_id_lifetime = server;
        self.session_id_lifetime = general;
        self
    }

    /// Sets the unused lifetimes for authenticated and unauthenticated sessions.
    #[must_use]
    pub const fn unused_lifetimes(mut self, authenticated: i64, unauthenticated: i64) -> Self {
        self.session_id_unused_lifetime = authenticated;
        self.session_id_unauthenticated_unused_lifetime = unauthenticated;
        self
    }

    /// Selects the shared cache (`true`) or the directory store (`false`).
    #[must_use]
    pub const fn persist_in_cache(mut self, in_cache: bool) -> Self {
        self.session_id_persist_in_cache = in_cache;
        self
    }

    /// Enables persistence for `prompt=none` sessions.
    #[must_use]
    pub const fn persist_on_prompt_none(mut self, persist: bool) -> Self {
        self.session_id_persist_on_prompt_none = persist;
        self
    }

    /// Enables signed JWT snapshots.
    #[must_use]
    pub const fn session_as_jwt(mut self, as_jwt: bool) -> Self {
        self.session_as_jwt = as_jwt;
        self
    }

    /// Enables identifier rotation on authentication.
    #[must_use]
    pub const fn change_session_id_on_authentication(mut self, change: bool) -> Self {
        self.change_session_id_on_authentication = change;
        self
    }

    /// Sets the number of merge attempts.
    #[must_use]
    pub const fn max_merge_attempts(mut self, attempts: u32) -> Self {
        self.max_merge_attempts = attempts;
        self
    }

    /// Returns the local cache entry lifetime.
    #[must_use]
    pub const fn local_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.local_cache_ttl_secs)
    }
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(None);
    };
    let parsed = raw.trim().parse().ok();
    match parsed {
        Some(value) => Ok(Some(value)),
        None => Err(Error::InvalidSetting {
            name: name.to_string(),
            value: raw,
        }),
    }
}

fn default_issuer() -> String {
    "https://localhost".to_string()
}

fn default_sessions_base_dn() -> String {
    "ou=sessions,o=jans".to_string()
}

const fn default_unused_lifetime() -> i64 {
    86_400
}

const fn default_unauthenticated_unused_lifetime() -> i64 {
    120
}

const fn default_true() -> bool {
    true
}

const fn default_local_cache_ttl() -> u64 {
    120
}

const fn default_debounce_ms() -> i64 {
    500
}

const fn default_max_merge_attempts() -> u32 {
    3
}

//! Redis connection configuration.

use serde::{Deserialize, Serialize};

/// Connection settings for the shared session cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// `host:port` of the Redis server.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// ACL username.
    #[serde(default)]
    pub username: Option<String>,
    /// Password.
    #[serde(default)]
    pub password: Option<String>,
    /// Logical database.
    #[serde(default)]
    pub database: u8,
    /// Connect with TLS.
    #[serde(default)]
    pub tls: bool,
    /// Namespace prepended to every session key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            username: None,
            password: None,
            database: 0,
            tls: false,
            key_prefix: default_key_prefix(),
        }
    }
}

impl RedisConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `OX_REDIS_*` environment variables over the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(endpoint) = std::env::var("OX_REDIS_ENDPOINT") {
            config.endpoint = endpoint;
        }
        config.username = std::env::var("OX_REDIS_USERNAME").ok();
        config.password = std::env::var("OX_REDIS_PASSWORD").ok();
        if let Some(database) = std::env::var("OX_REDIS_DATABASE")
            .ok()
            .and_then(|db| db.parse().ok())
        {
            config.database = database;
        }
        config.tls = std::env::var("OX_REDIS_TLS").is_ok_and(|tls| tls == "true");
        config
    }

    /// Sets the `host:port` endpoint.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the password and optional ACL user.
    #[must_use]
    pub fn credentials(mut self, username: Option<String>, password: impl Into<String>) -> Self {
        self.username = username;
        self.password = Some(password.into());
        self
    }

    /// Selects the logical database.
    #[must_use]
    pub const fn database(mut self, database: u8) -> Self {
        self.database = database;
        self
    }

    /// Enables TLS.
    #[must_use]
    pub const fn tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Sets the key namespace. An empty prefix stores keys as given.
    #[must_use]
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Returns the connection URL understood by `fred`.
    #[must_use]
    pub fn connection_url(&self) -> String {
        let scheme = if self.tls { "rediss" } else { "redis" };
        let auth = match (&self.username, &self.password) {
            (Some(user), Some(pass)) => format!("{user}:{pass}@"),
            (None, Some(pass)) => format!(":{pass}@"),
            _ => String::new(),
        };
        format!("{scheme}://{auth}{}/{}", self.endpoint, self.database)
    }

    /// Returns the Redis key for a session directory key.
    ///
    /// Directory keys contain `=` and `,`, which Redis accepts verbatim.
    #[must_use]
    pub fn session_key(&self, dn: &str) -> String {
        if self.key_prefix.is_empty() {
            dn.to_string()
        } else {
            format!("{}:{dn}", self.key_prefix)
        }
    }
}

fn default_endpoint() -> String {
    "localhost:6379".to_string()
}

fn default_key_prefix() -> String {
    "ox:session".to_string()
}

//! OIDC `session_state` derivation.
//!
//! ```text
//! session_state = hex(SHA-256(client_id + " " + origin + " " + opbs + " " + salt)) + "." + salt
//! ```
//!
//! `origin` is `scheme://host[:port]` of the redirect URI, or the issuer
//! when the request carries no redirect URI. The port appears whenever the
//! URI spells one out, default ports included. Private-use schemes of
//! native apps have no host and yield `scheme://`.

use ox_crypto::{random, sha256_hex};
use url::Url;

use crate::error::{SessionError, SessionResult};

/// Derives `session_state` values for one issuer.
#[derive(Debug, Clone)]
pub struct SessionStateCodec {
    issuer: String,
}

impl SessionStateCodec {
    /// Creates a codec for `issuer`.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
        }
    }

    /// Returns the origin used for `redirect_uri`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidRedirectUri`] if the URI cannot be parsed.
    pub fn client_origin(&self, redirect_uri: Option<&str>) -> SessionResult<String> {
        let Some(redirect_uri) = redirect_uri.filter(|uri| !uri.is_empty()) else {
            return Ok(self.issuer.clone());
        };

        let url = Url::parse(redirect_uri).map_err(|e| SessionError::InvalidRedirectUri {
            uri: redirect_uri.to_string(),
            reason: e.to_string(),
        })?;
        let host = url.host_str().unwrap_or_default();

        // `Url` drops default ports; keep one the URI spelled out.
        Ok(match url.port().or_else(|| explicit_port(redirect_uri)) {
            Some(port) => format!("{}://{host}:{port}", url.scheme()),
            None => format!("{}://{host}", url.scheme()),
        })
    }

    /// Computes `session_state` with a fresh salt.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect URI is invalid.
    pub fn generate(
        &self,
        client_id: Option<&str>,
        redirect_uri: Option<&str>,
        opbs: &str,
    ) -> SessionResult<String> {
        let origin = self.client_origin(redirect_uri)?;
        Ok(compute(
            client_id.unwrap_or_default(),
            &origin,
            opbs,
            &random::generate_salt(),
        ))
    }
}

fn explicit_port(uri: &str) -> Option<u16> {
    let (_, rest) = uri.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, host_port)| host_port);
    let (_, port) = host_port.rsplit_once(':')?;
    if port.contains(']') {
        return None;
    }
    port.parse().ok()
}

/// Computes `session_state` from its inputs.
#[must_use]
pub fn compute(client_id: &str, origin: &str, opbs: &str, salt: &str) -> String {
    let digest = sha256_hex(format!("{client_id} {origin} {opbs} {salt}").as_bytes());
    format!("{digest}.{salt}")
}

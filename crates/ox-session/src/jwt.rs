//! Signed session snapshots.
//!
//! When `session_as_jwt` is enabled every session carries a JWT with its
//! identifier, subject, state, attributes and consent grants, signed with
//! the active key of a [`SigningKeyProvider`]. There is no unsigned
//! fallback: signing errors propagate.

use std::collections::HashMap;
use std::sync::Arc;

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use ox_crypto::{SignatureAlgorithm, SignatureError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::model::SessionId;

/// Key material for signing session snapshots.
#[derive(Clone)]
pub struct SessionSigningKey {
    /// Key ID (kid).
    pub kid: String,

    /// Signing algorithm.
    pub algorithm: SignatureAlgorithm,

    encoding_key: EncodingKey,
}

impl std::fmt::Debug for SessionSigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .field("encoding_key", &"[REDACTED]")
            .finish()
    }
}

impl SessionSigningKey {
    /// Creates a signing key from a PEM-encoded private key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not match the algorithm family.
    pub fn from_pem(
        kid: impl Into<String>,
        algorithm: SignatureAlgorithm,
        private_key_pem: &[u8],
    ) -> Result<Self, SignatureError> {
        let encoding_key = if algorithm.is_ecdsa() {
            EncodingKey::from_ec_pem(private_key_pem)
        } else {
            EncodingKey::from_rsa_pem(private_key_pem)
        }
        .map_err(|e| SignatureError::InvalidKey(e.to_string()))?;

        Ok(Self {
            kid: kid.into(),
            algorithm,
            encoding_key,
        })
    }

    /// Returns the `jsonwebtoken` algorithm.
    const fn jwt_algorithm(&self) -> Algorithm {
        match self.algorithm {
            SignatureAlgorithm::Es384 => Algorithm::ES384,
            SignatureAlgorithm::Rs384 => Algorithm::RS384,
            SignatureAlgorithm::Rs512 => Algorithm::RS512,
            SignatureAlgorithm::Ps384 => Algorithm::PS384,
            SignatureAlgorithm::Ps512 => Algorithm::PS512,
        }
    }
}

/// Source of the server's active signing key.
pub trait SigningKeyProvider: Send + Sync {
    /// Returns the key new snapshots are signed with.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::NoActiveKey`] if no key is active.
    fn active_key(&self) -> Result<Arc<SessionSigningKey>, SignatureError>;
}

#[derive(Debug, Default)]
struct KeyRingState {
    keys: HashMap<String, Arc<SessionSigningKey>>,
    active: Option<String>,
}

/// In-process [`SigningKeyProvider`] holding keys by `kid`.
///
/// The first key added becomes active.
#[derive(Debug, Default)]
pub struct KeyRing {
    state: RwLock<KeyRingState>,
}

impl KeyRing {
    /// Creates an empty key ring.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a signing key.
    pub fn add_key(&self, key: SessionSigningKey) {
        let mut state = self.state.write();
        let kid = key.kid.clone();
        if state.active.is_none() {
            state.active = Some(kid.clone());
        }
        state.keys.insert(kid, Arc::new(key));
    }

    /// Sets the active signing key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key ID is not found.
    pub fn set_active(&self, kid: &str) -> Result<(), SignatureError> {
        let mut state = self.state.write();
        if state.keys.contains_key(kid) {
            state.active = Some(kid.to_string());
            Ok(())
        } else {
            Err(SignatureError::InvalidKey(format!("signing key not found: {kid}")))
        }
    }
}

impl SigningKeyProvider for KeyRing {
    fn active_key(&self) -> Result<Arc<SessionSigningKey>, SignatureError> {
        let state = self.state.read();
        state
            .active
            .as_ref()
            .and_then(|kid| state.keys.get(kid))
            .cloned()
            .ok_or(SignatureError::NoActiveKey)
    }
}

/// Claims of a session snapshot. Timestamps are seconds since the epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Issuer.
    pub iss: String,
    /// Audience: the subject DN, when authenticated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    /// Issued at.
    pub iat: i64,
    /// Session expiration.
    pub exp: i64,
    /// Session identifier.
    pub id: String,
    /// Authentication time.
    pub authentication_time: Option<i64>,
    /// Subject DN.
    pub user_dn: Option<String>,
    /// Lifecycle state.
    pub state: String,
    /// Session attributes.
    pub session_attributes: HashMap<String, String>,
    /// Last use.
    pub last_used_at: Option<i64>,
    /// Consent grants.
    pub permission_granted_map: HashMap<String, bool>,
}

impl SessionClaims {
    /// Builds the claims for a session.
    #[must_use]
    pub fn from_session(session: &SessionId, issuer: &str) -> Self {
        Self {
            iss: issuer.to_string(),
            aud: session.user_dn.clone(),
            iat: chrono::Utc::now().timestamp(),
            exp: session.expiration_date.timestamp(),
            id: session.id().to_string(),
            authentication_time: session.authentication_time.map(|t| t.timestamp()),
            user_dn: session.user_dn.clone(),
            state: session.state.as_str().to_string(),
            session_attributes: session.attributes_snapshot(),
            last_used_at: session.last_used_at.map(|t| t.timestamp()),
            permission_granted_map: session.permission_granted_map.clone(),
        }
    }
}

/// Encodes sessions as signed JWTs.
#[derive(Clone)]
pub struct SessionJwtEncoder {
    issuer: String,
    keys: Arc<dyn SigningKeyProvider>,
}

impl std::fmt::Debug for SessionJwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionJwtEncoder")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl SessionJwtEncoder {
    /// Creates an encoder.
    #[must_use]
    pub fn new(issuer: impl Into<String>, keys: Arc<dyn SigningKeyProvider>) -> Self {
        Self {
            issuer: issuer.into(),
            keys,
        }
    }

    /// Signs a snapshot of `session`.
    ///
    /// # Errors
    ///
    /// Returns an error if no key is active or signing fails.
    pub fn encode(&self, session: &SessionId) -> Result<String, SignatureError> {
        let key = self.keys.active_key()?;
        let claims = SessionClaims::from_session(session, &self.issuer);

        let mut header = Header::new(key.jwt_algorithm());
        header.kid = Some(key.kid.clone());
        header.typ = Some("JWT".to_string());

        encode(&header, &claims, &key.encoding_key)
            .map_err(|e| SignatureError::Signing(e.to_string()))
    }
}

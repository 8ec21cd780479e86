//! Signed session snapshot integration tests.

use std::collections::HashMap;
use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use ox_crypto::SignatureAlgorithm;
use ox_session::{
    KeyRing, RequestContext, SessionClaims, SessionError, SessionIdState, SessionSigningKey,
};

use crate::common::{
    RecordingCookieWriter, RecordingListener, TestEnv, USER_DN, authz_attributes, config,
};

const PRIVATE_KEY: &str = include_str!("../fixtures/session-signing.key");
const PUBLIC_KEY: &str = include_str!("../fixtures/session-signing.pub");

fn key_ring() -> anyhow::Result<Arc<KeyRing>> {
    let ring = KeyRing::new();
    ring.add_key(SessionSigningKey::from_pem(
        "session-key-1",
        SignatureAlgorithm::Rs512,
        PRIVATE_KEY.as_bytes(),
    )?);
    Ok(Arc::new(ring))
}

fn decode_claims(token: &str) -> anyhow::Result<SessionClaims> {
    let mut validation = Validation::new(Algorithm::RS512);
    validation.validate_aud = false;
    validation.set_issuer(&["https://op.example.com"]);
    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes())?,
        &validation,
    )?;
    Ok(data.claims)
}

/// Tests that JWT sessions carry a verifiable snapshot through login.
#[tokio::test]
async fn test_jwt_tracks_session_state() -> anyhow::Result<()> {
    let keys = key_ring()?;
    let env = TestEnv::with_config(config().session_as_jwt(true), |builder| {
        builder.signing_keys(keys)
    })?;

    let session = env
        .service
        .generate_unauthenticated_session(None, authz_attributes(), true, None)
        .await?;
    assert!(session.is_jwt);

    let token = session
        .jwt
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("missing jwt"))?;
    let claims = decode_claims(token)?;
    assert_eq!(claims.id, session.id());
    assert_eq!(claims.state, "unauthenticated");
    assert!(claims.user_dn.is_none());

    let ctx = RequestContext::new().with_cookie_writer(Arc::new(RecordingCookieWriter::default()));
    let session = env
        .service
        .set_session_state_authenticated(session, USER_DN, Some(&ctx))
        .await?;

    let token = session
        .jwt
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("missing jwt"))?;
    let claims = decode_claims(token)?;
    assert_eq!(claims.id, session.id(), "Snapshot follows the rotated id");
    assert_eq!(claims.state, "authenticated");
    assert_eq!(claims.aud.as_deref(), Some(USER_DN));
    assert!(claims.authentication_time.is_some());

    let loaded = env
        .service
        .get_session(session.id())
        .await
        .ok_or_else(|| anyhow::anyhow!("session not found"))?;
    assert_eq!(loaded.jwt, session.jwt);

    Ok(())
}

/// Tests that the snapshot describes the session as written.
#[tokio::test]
async fn test_jwt_signed_after_timestamps() -> anyhow::Result<()> {
    let keys = key_ring()?;
    let env = TestEnv::with_config(config().session_as_jwt(true), |builder| {
        builder.signing_keys(keys)
    })?;

    let session = env
        .service
        .generate_authenticated_session(USER_DN, authz_attributes(), None)
        .await?;
    let token = session
        .jwt
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("missing jwt"))?;
    let claims = decode_claims(token)?;

    assert_eq!(claims.last_used_at, session.last_used_at.map(|t| t.timestamp()));
    assert_eq!(claims.exp, session.expiration_date.timestamp());

    Ok(())
}

/// Tests that a vetoed JWT session is re-signed as unauthenticated.
#[tokio::test]
async fn test_veto_resigns_snapshot() -> anyhow::Result<()> {
    let keys = key_ring()?;
    let (listener, _events) = RecordingListener::new(false);
    let env = TestEnv::with_config(config().session_as_jwt(true), |builder| {
        builder.signing_keys(keys).listener(listener)
    })?;

    let err = env
        .service
        .generate_authenticated_session(USER_DN, authz_attributes(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::InvalidSessionState(_)));

    let stored = env.service.find_by_user(USER_DN).await?;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].state, SessionIdState::Unauthenticated);

    let token = stored[0]
        .jwt
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("missing jwt"))?;
    let claims = decode_claims(token)?;
    assert_eq!(claims.state, "unauthenticated");
    assert_eq!(
        claims.session_attributes.get("auth_step").map(String::as_str),
        Some("1")
    );

    let mut session = stored[0].clone();
    session.state = SessionIdState::Authenticated;
    assert!(env.service.reinit_login(&mut session, &HashMap::new(), true).await?);
    let token = session
        .jwt
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("missing jwt"))?;
    assert_eq!(decode_claims(token)?.state, "unauthenticated");

    Ok(())
}

/// Tests that signing failures propagate instead of producing unsigned sessions.
#[tokio::test]
async fn test_signing_failure_propagates() -> anyhow::Result<()> {
    let env = TestEnv::with_config(config().session_as_jwt(true), |builder| {
        builder.signing_keys(Arc::new(KeyRing::new()))
    })?;

    let err = env
        .service
        .generate_authenticated_session(USER_DN, authz_attributes(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Signing(_)));
    assert!(!err.requires_login());
    assert!(env.directory.is_empty().await);

    Ok(())
}

//! Expiration integration tests.

use std::sync::Arc;

use chrono::{Duration, Utc};
use ox_cache::InMemoryCacheProvider;
use ox_core::config::LIFETIME_DISABLED;
use ox_session::SessionService;

use crate::common::{TestEnv, USER_DN, attributes, authz_attributes, config, init_tracing};

/// Tests that a session idle past its unused lifetime disappears on read.
#[tokio::test]
async fn test_idle_session_expires_on_read() -> anyhow::Result<()> {
    let env = TestEnv::with_config(config().unused_lifetimes(600, 120), |builder| builder)?;

    let mut session = env
        .service
        .generate_authenticated_session(USER_DN, authz_attributes(), None)
        .await?;
    session.last_used_at = Some(Utc::now() - Duration::seconds(700));
    env.service.merge_with_retry(&mut session).await?;

    assert!(!env.service.is_session_valid(&session));
    assert!(env.service.get_session(session.id()).await.is_none());
    assert!(env.directory.is_empty().await, "Expired entry should be removed");

    Ok(())
}

/// Tests that an abandoned unauthenticated session expires on its own
/// shorter threshold.
#[tokio::test]
async fn test_unauthenticated_session_uses_shorter_threshold() -> anyhow::Result<()> {
    let env = TestEnv::with_config(config().unused_lifetimes(86_400, 60), |builder| builder)?;

    let mut pending = env
        .service
        .generate_unauthenticated_session(None, authz_attributes(), true, None)
        .await?;
    assert_eq!(pending.ttl, 60);

    pending.last_used_at = Some(Utc::now() - Duration::seconds(90));
    env.service.merge_with_retry(&mut pending).await?;
    assert!(env.service.get_session(pending.id()).await.is_none());

    Ok(())
}

/// Tests that the absolute lifetime counts from authentication.
#[tokio::test]
async fn test_absolute_lifetime() -> anyhow::Result<()> {
    let env = TestEnv::with_config(config().lifetimes(Some(300), Some(3600)), |builder| builder)?;

    let mut session = env
        .service
        .generate_authenticated_session(USER_DN, authz_attributes(), None)
        .await?;
    assert_eq!(session.ttl, 300);
    assert_eq!(
        session.expiration_date,
        session.creation_date + Duration::seconds(300)
    );

    session.authentication_time = Some(Utc::now() - Duration::seconds(301));
    assert!(env.service.is_expired(&session));
    assert!(!env.service.update_session(&mut session, true, false, false).await);
    assert!(env.directory.is_empty().await);

    Ok(())
}

/// Tests that disabled unused lifetimes never expire idle sessions.
#[tokio::test]
async fn test_disabled_unused_lifetime() -> anyhow::Result<()> {
    let env = TestEnv::with_config(
        config().unused_lifetimes(LIFETIME_DISABLED, LIFETIME_DISABLED),
        |builder| builder,
    )?;

    let mut session = env
        .service
        .generate_authenticated_session(USER_DN, authz_attributes(), None)
        .await?;
    assert!(!session.persisted, "Non-positive unused lifetime skips persistence");

    session.last_used_at = Some(Utc::now() - Duration::days(30));
    assert!(env.service.is_session_valid(&session));
    assert!(env.service.update_session(&mut session, true, false, true).await);

    Ok(())
}

/// Tests that a disabled unauthenticated threshold keeps pending sessions
/// in the shared cache.
#[tokio::test]
async fn test_disabled_threshold_keeps_cached_session() -> anyhow::Result<()> {
    init_tracing();
    let mut config = config()
        .persist_in_cache(true)
        .unused_lifetimes(86_400, LIFETIME_DISABLED);
    config.local_cache_ttl_secs = 0;
    let service = SessionService::builder(config)
        .cache_backend(Arc::new(InMemoryCacheProvider::new()))
        .build()?;

    let pending = service
        .generate_unauthenticated_session(None, authz_attributes(), true, None)
        .await?;
    assert!(pending.persisted);
    assert_eq!(pending.ttl, LIFETIME_DISABLED);
    assert!(pending.expiration_date > pending.creation_date);

    tokio::time::sleep(std::time::Duration::from_millis(1300)).await;
    let loaded = service
        .get_session(pending.id())
        .await
        .ok_or_else(|| anyhow::anyhow!("pending session dropped out of the cache"))?;
    assert_eq!(loaded.session_state, pending.session_state);

    Ok(())
}

/// Tests that `prompt=none` sessions stay request-local when configured.
#[tokio::test]
async fn test_prompt_none_is_not_persisted() -> anyhow::Result<()> {
    let env = TestEnv::with_config(config().persist_on_prompt_none(false), |builder| builder)?;

    let session = env
        .service
        .generate_unauthenticated_session(
            None,
            attributes(&[("client_id", "rp-client"), ("prompt", "none")]),
            true,
            None,
        )
        .await?;

    assert!(!session.persisted);
    assert!(env.directory.is_empty().await);
    assert!(env.service.get_session(session.id()).await.is_none());

    Ok(())
}

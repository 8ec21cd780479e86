//! Backend integration tests.
//!
//! The shared cache tests run against the in-memory provider. The
//! PostgreSQL and Redis tests are skipped unless their environment
//! variables point at a live server.

use std::sync::Arc;

use ox_cache::InMemoryCacheProvider;
use ox_cache_redis::{RedisCacheProvider, RedisConfig};
use ox_session::{SessionError, SessionService, StoreError};
use ox_storage_sql::{PgDirectoryProvider, PoolConfig, create_pool, run_migrations};

use crate::common::{USER_DN, authz_attributes, config, init_tracing};

/// Tests the session lifecycle over the shared cache.
#[tokio::test]
async fn test_cache_backend_lifecycle() -> anyhow::Result<()> {
    init_tracing();
    let service = SessionService::builder(config().persist_in_cache(true))
        .cache_backend(Arc::new(InMemoryCacheProvider::new()))
        .build()?;

    let mut session = service
        .generate_authenticated_session(USER_DN, authz_attributes(), None)
        .await?;
    session.grant_permission("openid", true);
    assert!(service.update_session(&mut session, false, false, true).await);

    let loaded = service
        .get_session_by_id(session.id(), false)
        .await
        .ok_or_else(|| anyhow::anyhow!("session not found"))?;
    assert!(loaded.is_permission_granted("openid"));

    let err = service.find_by_user(USER_DN).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Storage(StoreError::Unsupported("cache"))
    ));

    assert!(service.remove(&session).await);
    assert!(service.get_session(session.id()).await.is_none());

    Ok(())
}

/// Tests the session lifecycle and conflict handling over PostgreSQL.
#[tokio::test]
async fn test_postgres_backend() -> anyhow::Result<()> {
    let Ok(url) = std::env::var("OX_TEST_DATABASE_URL") else {
        tracing::warn!("OX_TEST_DATABASE_URL not set, skipping");
        return Ok(());
    };
    init_tracing();

    let pool = create_pool(&PoolConfig::new(url).max_connections(2)).await?;
    run_migrations(&pool).await?;
    let directory = Arc::new(PgDirectoryProvider::new(pool));

    let service = SessionService::builder(config())
        .directory_backend(directory)
        .build()?;

    let session = service
        .generate_authenticated_session(USER_DN, authz_attributes(), None)
        .await?;
    let mut first = session.clone();
    let mut second = session;
    first.grant_permission("profile", true);
    second.grant_permission("email", true);

    assert!(service.update_session(&mut first, false, false, true).await);
    assert!(service.update_session(&mut second, false, false, true).await);
    assert_eq!(second.version(), 3);

    let sessions = service.find_by_user(USER_DN).await?;
    assert!(sessions.iter().any(|s| s.id() == second.id()));

    assert_eq!(service.remove_all(&sessions).await, sessions.len());
    assert!(service.get_session(second.id()).await.is_none());

    Ok(())
}

/// Tests the session lifecycle over Redis.
#[tokio::test]
async fn test_redis_backend() -> anyhow::Result<()> {
    let Ok(endpoint) = std::env::var("OX_TEST_REDIS_ENDPOINT") else {
        tracing::warn!("OX_TEST_REDIS_ENDPOINT not set, skipping");
        return Ok(());
    };
    init_tracing();

    let cache =
        RedisCacheProvider::new(RedisConfig::new().endpoint(endpoint).key_prefix("ox-test")).await?;
    let service = SessionService::builder(config().persist_in_cache(true))
        .cache_backend(Arc::new(cache))
        .build()?;

    let session = service
        .generate_unauthenticated_session(None, authz_attributes(), true, None)
        .await?;
    let loaded = service
        .get_session(session.id())
        .await
        .ok_or_else(|| anyhow::anyhow!("session not found"))?;
    assert_eq!(loaded.session_state, session.session_state);

    assert!(service.remove(&session).await);

    Ok(())
}

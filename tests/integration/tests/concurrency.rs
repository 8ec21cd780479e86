//! Write conflict integration tests.

use ox_session::SessionError;
use ox_storage::DirectoryProvider;

use crate::common::{TestEnv, USER_DN, authz_attributes};

/// Tests that transient conflicts are retried until the merge lands.
#[tokio::test]
async fn test_merge_retries_through_conflicts() -> anyhow::Result<()> {
    let (env, store) = TestEnv::with_conflicts(2)?;

    let mut session = env
        .service
        .generate_authenticated_session(USER_DN, authz_attributes(), None)
        .await?;
    session.set_attribute("consent", "granted");

    assert!(env.service.update_session(&mut session, false, false, true).await);
    assert_eq!(store.merges(), 3);

    let stored = env
        .directory
        .find(session.dn())
        .await?
        .ok_or_else(|| anyhow::anyhow!("entry missing"))?;
    assert_eq!(
        stored.session_attributes.get("consent").map(String::as_str),
        Some("granted")
    );

    Ok(())
}

/// Tests that exhausting the attempts surfaces a conflict.
#[tokio::test]
async fn test_merge_gives_up_after_max_attempts() -> anyhow::Result<()> {
    let (env, store) = TestEnv::with_conflicts(3)?;

    let mut session = env
        .service
        .generate_authenticated_session(USER_DN, authz_attributes(), None)
        .await?;
    session.set_attribute("consent", "granted");

    let err = env.service.merge_with_retry(&mut session).await.unwrap_err();
    assert!(
        matches!(err, SessionError::Conflict { attempts: 3, .. }),
        "unexpected error: {err}"
    );
    assert_eq!(store.merges(), 3);

    let stored = env
        .directory
        .find(session.dn())
        .await?
        .ok_or_else(|| anyhow::anyhow!("entry missing"))?;
    assert!(!stored.session_attributes.contains_key("consent"));

    Ok(())
}

/// Tests that two concurrent writers of the same session both succeed.
#[tokio::test]
async fn test_concurrent_updates_of_one_session() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let session = env
        .service
        .generate_authenticated_session(USER_DN, authz_attributes(), None)
        .await?;
    let mut first = session.clone();
    let mut second = session;
    first.grant_permission("profile", true);
    second.grant_permission("email", true);

    let (a, b) = tokio::join!(
        env.service.update_session(&mut first, false, false, true),
        env.service.update_session(&mut second, false, false, true),
    );
    assert!(a && b, "Both writers should land");

    let stored = env
        .directory
        .find(first.dn())
        .await?
        .ok_or_else(|| anyhow::anyhow!("entry missing"))?;
    assert_eq!(stored.version, 3);

    let landed = if first.version() == 3 { &first } else { &second };
    assert_eq!(
        stored.permission_granted_map, landed.permission_granted_map,
        "Stored grants should be exactly one writer's snapshot"
    );
    assert_eq!(stored.permission_granted_map.len(), 1);
    assert_eq!(stored.session_attributes, landed.attributes_snapshot());

    Ok(())
}

//! Step-up authentication integration tests.

use ox_session::{RequestContext, SessionError, attrs, state_token};
use ox_storage::DirectoryProvider;

use crate::common::{TestEnv, USER_DN, attributes, authz_attributes};

async fn otp_session(env: &TestEnv) -> anyhow::Result<ox_session::SessionId> {
    let mut request = authz_attributes();
    request.insert("acr".to_string(), "otp".to_string());
    request.insert("auth_step".to_string(), "2".to_string());
    Ok(env
        .service
        .generate_authenticated_session(USER_DN, request, None)
        .await?)
}

/// Tests that a request for the session's own ACR with the same parameters
/// leaves the stored session untouched.
#[tokio::test]
async fn test_same_acr_same_parameters_is_noop() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let session = otp_session(&env).await?;

    let ctx = RequestContext::new()
        .with_parameter("client_id", "rp-client")
        .with_parameter("state", "a-new-state");
    let result = env
        .service
        .assert_authenticated_session_corresponds_to_new_request(session.clone(), Some("otp"), Some(&ctx))
        .await?;

    assert_eq!(result.version(), session.version(), "No write expected");
    assert_eq!(result.attribute(attrs::AUTH_STEP), Some("2"));
    assert!(result.is_authenticated());

    Ok(())
}

/// Tests that the same ACR with new parameters restarts the login steps.
#[tokio::test]
async fn test_same_acr_new_parameters_reinitializes() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let session = otp_session(&env).await?;

    let ctx = RequestContext::new().with_parameter("scope", "openid profile");
    let result = env
        .service
        .assert_authenticated_session_corresponds_to_new_request(session.clone(), Some("otp"), Some(&ctx))
        .await?;

    assert_eq!(result.attribute("scope"), Some("openid profile"));
    assert_eq!(result.attribute(attrs::AUTH_STEP), Some("1"));
    assert!(result.is_authenticated());
    assert!(result.version() > session.version());

    Ok(())
}

/// Tests that a weaker requested ACR is served by the stronger session.
#[tokio::test]
async fn test_weaker_acr_is_satisfied() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let session = otp_session(&env).await?;

    let result = env
        .service
        .assert_authenticated_session_corresponds_to_new_request(session.clone(), Some("basic"), None)
        .await?;

    assert_eq!(result, session);

    Ok(())
}

/// Tests that a stronger requested ACR requires step-up.
#[tokio::test]
async fn test_stronger_acr_requires_step_up() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let session = otp_session(&env).await?;

    let err = env
        .service
        .assert_authenticated_session_corresponds_to_new_request(session, Some("basic u2f"), None)
        .await
        .unwrap_err();

    assert!(
        matches!(&err, SessionError::StepUpRequired { requested, .. } if requested == "u2f"),
        "unexpected error: {err}"
    );
    assert!(err.is_acr_failure());
    assert!(err.requires_login());

    Ok(())
}

/// Tests that an unmapped ACR is reported as unavailable.
#[tokio::test]
async fn test_unmapped_acr_is_unavailable() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let session = otp_session(&env).await?;

    let err = env
        .service
        .assert_authenticated_session_corresponds_to_new_request(
            session,
            Some(r#"["smartcard"]"#),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::AcrUnavailable(acr) if acr == "smartcard"));

    Ok(())
}

/// Tests that the check is skipped for sessions without an ACR.
#[tokio::test]
async fn test_session_without_acr_is_returned_as_is() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let session = env
        .service
        .generate_authenticated_session(USER_DN, attributes(&[("client_id", "rp-client")]), None)
        .await?;

    let result = env
        .service
        .assert_authenticated_session_corresponds_to_new_request(session.clone(), Some("u2f"), None)
        .await?;
    assert_eq!(result, session);
    assert_eq!(env.service.get_acr(&result), None);

    Ok(())
}

/// Tests a login from an unauthenticated session through later requests
/// for a weaker and then a stronger ACR.
#[tokio::test]
async fn test_login_then_step_up_flow() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let pending = env
        .service
        .generate_unauthenticated_session(
            None,
            attributes(&[
                ("client_id", "c1"),
                ("redirect_uri", "https://rp.example/cb"),
                ("acr_values", "otp"),
            ]),
            true,
            None,
        )
        .await?;
    assert!(!pending.is_authenticated());

    let session = env
        .service
        .set_session_state_authenticated(pending, USER_DN, None)
        .await?;
    assert!(session.is_authenticated());
    assert_eq!(env.service.get_acr(&session).as_deref(), Some("otp"));

    let session_state = session
        .session_state
        .clone()
        .ok_or_else(|| anyhow::anyhow!("missing session_state"))?;
    let (_, salt) = session_state
        .split_once('.')
        .ok_or_else(|| anyhow::anyhow!("session_state without salt"))?;
    let opbs = session
        .op_browser_state()
        .ok_or_else(|| anyhow::anyhow!("missing opbs"))?;
    assert_eq!(
        state_token::compute("c1", "https://rp.example", opbs, salt),
        session_state
    );

    let version = session.version();
    let satisfied = env
        .service
        .assert_authenticated_session_corresponds_to_new_request(session, Some("basic"), None)
        .await?;
    assert_eq!(satisfied.version(), version, "No write expected");
    let stored = env
        .directory
        .find(satisfied.dn())
        .await?
        .ok_or_else(|| anyhow::anyhow!("entry missing"))?;
    assert_eq!(stored.version, version);

    let err = env
        .service
        .assert_authenticated_session_corresponds_to_new_request(satisfied, Some("u2f"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::StepUpRequired { .. }));

    Ok(())
}

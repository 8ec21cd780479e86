//! Common test utilities and fixtures.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ox_core::{AuditRecord, SessionConfig};
use ox_session::{
    AuditSink, DirectorySessionStore, RequestContext, SessionCookieWriter, SessionEvent,
    SessionEventType, SessionId, SessionListener, SessionService, SessionServiceBuilder,
    SessionStore, StaticAcrLevels, StoreError, StoreResult,
};
use ox_storage::InMemoryDirectory;
use tokio::sync::mpsc;

pub const USER_DN: &str = "inum=0001,ou=people,o=jans";
pub const CLIENT_ID: &str = "rp-client";
pub const REDIRECT_URI: &str = "https://rp.example.com:8443/callback";

/// Initializes tracing once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("ox_session=debug,ox_storage_sql=debug,sqlx=warn")
        .with_test_writer()
        .try_init();
}

/// Session service over an in-memory directory.
pub struct TestEnv {
    /// Service under test.
    pub service: SessionService,
    /// Backing directory.
    pub directory: Arc<InMemoryDirectory>,
}

impl TestEnv {
    /// Creates an environment with default configuration.
    pub fn new() -> anyhow::Result<Self> {
        Self::with_config(config(), |builder| builder)
    }

    /// Creates an environment with `config`, letting `customize` add
    /// listeners, keys or a store override.
    pub fn with_config(
        config: SessionConfig,
        customize: impl FnOnce(SessionServiceBuilder) -> SessionServiceBuilder,
    ) -> anyhow::Result<Self> {
        init_tracing();

        let directory = Arc::new(InMemoryDirectory::new());
        let builder = SessionService::builder(config)
            .directory_backend(Arc::clone(&directory))
            .acr_resolver(Arc::new(acr_levels()));
        let service = customize(builder).build()?;

        Ok(Self { service, directory })
    }

    /// Creates an environment whose store fails the first `conflicts` merges.
    pub fn with_conflicts(conflicts: u32) -> anyhow::Result<(Self, Arc<ConflictingStore>)> {
        init_tracing();

        let directory = Arc::new(InMemoryDirectory::new());
        let store = ConflictingStore::over(Arc::clone(&directory), conflicts);
        let service = SessionService::builder(config())
            .store(store.clone())
            .acr_resolver(Arc::new(acr_levels()))
            .build()?;

        Ok((Self { service, directory }, store))
    }
}

/// Test configuration.
pub fn config() -> SessionConfig {
    SessionConfig::new()
        .issuer("https://op.example.com")
        .sessions_base_dn("ou=sessions,o=jans")
}

/// ACR levels used by the step-up tests.
pub fn acr_levels() -> StaticAcrLevels {
    StaticAcrLevels::new()
        .with_level("basic", 1)
        .with_level("otp", 5)
        .with_level("u2f", 10)
}

/// Builds an attribute map.
pub fn attributes(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// Attributes of an authorization request from the test client.
pub fn authz_attributes() -> HashMap<String, String> {
    attributes(&[
        ("client_id", CLIENT_ID),
        ("redirect_uri", REDIRECT_URI),
        ("response_type", "code"),
        ("scope", "openid"),
        ("state", "af0ifjsldkj"),
    ])
}

/// Receives the next value or fails after a second.
pub async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> anyhow::Result<T> {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await?
        .ok_or_else(|| anyhow::anyhow!("channel closed"))
}

/// Collects everything received within `window`.
pub async fn drain<T>(rx: &mut mpsc::UnboundedReceiver<T>, window: Duration) -> Vec<T> {
    let mut received = Vec::new();
    while let Ok(Some(value)) = tokio::time::timeout(window, rx.recv()).await {
        received.push(value);
    }
    received
}

/// Listener that records event types and optionally vetoes session starts.
pub struct RecordingListener {
    tx: mpsc::UnboundedSender<SessionEventType>,
    allow: bool,
}

impl RecordingListener {
    /// Creates a listener and the receiving end of its events.
    pub fn new(allow: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<SessionEventType>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx, allow }), rx)
    }
}

#[async_trait]
impl SessionListener for RecordingListener {
    async fn start_session(&self, _: &SessionId, _: Option<&RequestContext>) -> bool {
        self.allow
    }

    async fn on_event(&self, event: &SessionEvent) -> Result<(), String> {
        self.tx.send(event.event_type).map_err(|e| e.to_string())
    }
}

/// Audit sink forwarding records to a channel.
pub struct RecordingAudit(mpsc::UnboundedSender<AuditRecord>);

impl RecordingAudit {
    /// Creates a sink and the receiving end of its records.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<AuditRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self(tx)), rx)
    }
}

#[async_trait]
impl AuditSink for RecordingAudit {
    async fn record(&self, record: AuditRecord) -> Result<(), String> {
        self.0.send(record).map_err(|e| e.to_string())
    }
}

/// Cookie writer remembering the identifiers it was asked to write.
#[derive(Default)]
pub struct RecordingCookieWriter {
    written: parking_lot::Mutex<Vec<String>>,
}

impl RecordingCookieWriter {
    /// Returns the written identifiers.
    pub fn written(&self) -> Vec<String> {
        self.written.lock().clone()
    }
}

impl SessionCookieWriter for RecordingCookieWriter {
    fn write_session_cookie(&self, session: &SessionId) {
        self.written.lock().push(session.id().to_string());
    }
}

/// Store that fails the first `conflicts` merges with a write conflict.
pub struct ConflictingStore {
    inner: Arc<dyn SessionStore>,
    conflicts: AtomicU32,
    merges: AtomicU32,
}

impl ConflictingStore {
    /// Wraps a directory store over `directory`.
    pub fn over(directory: Arc<InMemoryDirectory>, conflicts: u32) -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(DirectorySessionStore::new(directory, "ou=sessions,o=jans")),
            conflicts: AtomicU32::new(conflicts),
            merges: AtomicU32::new(0),
        })
    }

    /// Returns how many merges were attempted.
    pub fn merges(&self) -> u32 {
        self.merges.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionStore for ConflictingStore {
    fn name(&self) -> &'static str {
        "conflicting"
    }

    async fn get(&self, dn: &str) -> StoreResult<Option<SessionId>> {
        self.inner.get(dn).await
    }

    async fn persist(&self, session: &mut SessionId) -> StoreResult<()> {
        self.inner.persist(session).await
    }

    async fn merge(&self, session: &mut SessionId) -> StoreResult<()> {
        self.merges.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Conflict(format!("{}: injected", session.dn())));
        }
        self.inner.merge(session).await
    }

    async fn remove(&self, dn: &str) -> StoreResult<()> {
        self.inner.remove(dn).await
    }

    async fn find_by_user(&self, user_dn: &str) -> StoreResult<Vec<SessionId>> {
        self.inner.find_by_user(user_dn).await
    }
}

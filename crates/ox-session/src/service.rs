//! Session orchestration.
//!
//! Reads go through the process-local cache first and then the configured
//! backend. Writes go to the backend and refresh the local copy. Expired
//! sessions found on either path are removed before the caller sees them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ox_cache::{CacheProvider, LocalCache};
use ox_core::SessionConfig;
use ox_crypto::{SignatureError, random};
use ox_storage::DirectoryProvider;

use crate::acr::{AcrCheck, AcrLevelResolver, StaticAcrLevels, acr_values_list, check_acr};
use crate::context::RequestContext;
use crate::error::{SessionError, SessionResult};
use crate::events::{AuditSink, EventDispatcher, SessionEvent, SessionEventType, SessionListener};
use crate::jwt::{SessionJwtEncoder, SigningKeyProvider};
use crate::model::{SessionId, SessionIdState, attrs, build_dn};
use crate::policy::ExpirationPolicy;
use crate::state_token::SessionStateCodec;
use crate::store::{CacheSessionStore, DirectorySessionStore, SessionStore};

/// Builder for [`SessionService`].
pub struct SessionServiceBuilder {
    config: SessionConfig,
    store: Option<Arc<dyn SessionStore>>,
    cache: Option<Arc<dyn SessionStore>>,
    directory: Option<Arc<dyn SessionStore>>,
    acr: Option<Arc<dyn AcrLevelResolver>>,
    signing_keys: Option<Arc<dyn SigningKeyProvider>>,
    listeners: Vec<Arc<dyn SessionListener>>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl SessionServiceBuilder {
    /// Creates a builder.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            store: None,
            cache: None,
            directory: None,
            acr: None,
            signing_keys: None,
            listeners: Vec::new(),
            audit: None,
        }
    }

    /// Sets the shared cache backend, used when `session_id_persist_in_cache` is on.
    #[must_use]
    pub fn cache_backend<C: CacheProvider + 'static>(mut self, cache: Arc<C>) -> Self {
        self.cache = Some(Arc::new(CacheSessionStore::new(cache)));
        self
    }

    /// Sets the directory backend, used when `session_id_persist_in_cache` is off.
    #[must_use]
    pub fn directory_backend<D: DirectoryProvider + 'static>(mut self, directory: Arc<D>) -> Self {
        let base_dn = self.config.sessions_base_dn.clone();
        self.directory = Some(Arc::new(DirectorySessionStore::new(directory, base_dn)));
        self
    }

    /// Uses `store` regardless of the backend switch.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the ACR level resolver.
    #[must_use]
    pub fn acr_resolver(mut self, resolver: Arc<dyn AcrLevelResolver>) -> Self {
        self.acr = Some(resolver);
        self
    }

    /// Sets the signing key provider for session JWTs.
    #[must_use]
    pub fn signing_keys(mut self, keys: Arc<dyn SigningKeyProvider>) -> Self {
        self.signing_keys = Some(keys);
        self
    }

    /// Adds a session listener.
    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn SessionListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Sets the audit sink.
    #[must_use]
    pub fn audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Builds the service.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] if the selected backend is missing or
    /// JWT sessions are enabled without signing keys.
    pub fn build(self) -> SessionResult<SessionService> {
        let in_cache = self.config.session_id_persist_in_cache;
        let store = match (self.store, in_cache) {
            (Some(store), _) => store,
            (None, true) => self
                .cache
                .ok_or_else(|| SessionError::Config("cache backend is not configured".to_string()))?,
            (None, false) => self.directory.ok_or_else(|| {
                SessionError::Config("directory backend is not configured".to_string())
            })?,
        };

        if self.config.session_as_jwt && self.signing_keys.is_none() {
            return Err(SessionError::Config(
                "session_as_jwt requires a signing key provider".to_string(),
            ));
        }

        let jwt = self
            .signing_keys
            .map(|keys| SessionJwtEncoder::new(self.config.issuer.clone(), keys));

        tracing::info!(backend = store.name(), as_jwt = self.config.session_as_jwt, "Session service ready");

        Ok(SessionService {
            policy: ExpirationPolicy::new(&self.config),
            codec: SessionStateCodec::new(self.config.issuer.clone()),
            local: LocalCache::new(self.config.local_cache_ttl()),
            store,
            acr: self
                .acr
                .unwrap_or_else(|| Arc::new(StaticAcrLevels::new())),
            jwt,
            events: EventDispatcher::new(self.listeners, self.audit),
            config: self.config,
        })
    }
}

/// Creates, authenticates, validates, persists and expires sessions.
pub struct SessionService {
    config: SessionConfig,
    policy: ExpirationPolicy,
    codec: SessionStateCodec,
    store: Arc<dyn SessionStore>,
    local: LocalCache<SessionId>,
    acr: Arc<dyn AcrLevelResolver>,
    jwt: Option<SessionJwtEncoder>,
    events: EventDispatcher,
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("backend", &self.store.name())
            .field("local_entries", &self.local.len())
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl SessionService {
    /// Creates a builder.
    #[must_use]
    pub fn builder(config: SessionConfig) -> SessionServiceBuilder {
        SessionServiceBuilder::new(config)
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the expiration policy.
    #[must_use]
    pub const fn policy(&self) -> &ExpirationPolicy {
        &self.policy
    }

    /// Returns the directory key for a session identifier.
    #[must_use]
    pub fn build_dn(&self, id: &str) -> String {
        build_dn(id, &self.config.sessions_base_dn)
    }

    // === Lookup ===

    /// Returns a live session by identifier.
    pub async fn get_session(&self, id: &str) -> Option<SessionId> {
        self.get_session_by_id(id, false).await
    }

    /// Returns a live session by identifier.
    ///
    /// A session past its unused or absolute lifetime is removed and
    /// reported as absent. `silently` suppresses backend error logs.
    pub async fn get_session_by_id(&self, id: &str, silently: bool) -> Option<SessionId> {
        if id.trim().is_empty() {
            return None;
        }

        let session = self.get_session_by_dn(&self.build_dn(id), silently).await?;
        let now = Utc::now();
        if self.policy.is_valid(&session, now) && !self.policy.is_expired(&session, now) {
            return Some(session);
        }

        tracing::debug!(session_id = %id, "Session expired, removing it");
        self.remove(&session).await;
        None
    }

    /// Returns a session by directory key without checking its lifetimes
    /// against the backend copy.
    ///
    /// Backend failures are logged and reported as absent.
    pub async fn get_session_by_dn(&self, dn: &str, silently: bool) -> Option<SessionId> {
        if let Some(local) = self.local.get(dn) {
            if self.policy.is_valid(&local, Utc::now()) {
                return Some(local);
            }
            self.local.remove(dn);
        }

        match self.store.get(dn).await {
            Ok(Some(session)) => {
                self.local.put(dn, session.clone());
                Some(session)
            }
            Ok(None) => None,
            Err(e) => {
                if !silently {
                    tracing::error!(dn, backend = self.store.name(), error = %e, "Failed to get session");
                }
                None
            }
        }
    }

    /// Resolves the identifiers of the transport's current-sessions cookie
    /// to live, authenticated sessions.
    pub async fn current_sessions(&self, ids: &[String]) -> Vec<SessionId> {
        let mut seen = HashSet::new();
        let mut sessions = Vec::new();

        for id in ids {
            if id.trim().is_empty() {
                tracing::error!("Blank identifier in current sessions");
                continue;
            }
            if !seen.insert(id.as_str()) {
                continue;
            }

            let Some(session) = self.get_session(id).await else {
                tracing::trace!(session_id = %id, "Current session not found or expired");
                continue;
            };

            if !session.is_authenticated() {
                tracing::error!(session_id = %id, "Current session is not authenticated");
                continue;
            }
            sessions.push(session);
        }

        sessions
    }

    /// Lists the sessions of a subject.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] if the backend cannot list by
    /// subject or the lookup fails.
    pub async fn find_by_user(&self, user_dn: &str) -> SessionResult<Vec<SessionId>> {
        Ok(self.store.find_by_user(user_dn).await?)
    }

    /// Returns the session's ACR, falling back to the requested `acr_values`.
    #[must_use]
    pub fn get_acr(&self, session: &SessionId) -> Option<String> {
        session.acr().map(ToString::to_string)
    }

    // === Creation ===

    /// Creates and persists an authenticated session for `user_dn`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSessionState`] if the subject is blank
    /// (outside UMA) or a listener rejects the session.
    pub async fn generate_authenticated_session(
        &self,
        user_dn: &str,
        attributes: HashMap<String, String>,
        ctx: Option<&RequestContext>,
    ) -> SessionResult<SessionId> {
        self.generate_session(
            Some(user_dn),
            Some(Utc::now()),
            SessionIdState::Authenticated,
            attributes,
            true,
            ctx,
        )
        .await
    }

    /// Creates an unauthenticated session.
    ///
    /// # Errors
    ///
    /// Returns an error if `session_state` or the JWT cannot be computed.
    pub async fn generate_unauthenticated_session(
        &self,
        user_dn: Option<&str>,
        attributes: HashMap<String, String>,
        persist: bool,
        ctx: Option<&RequestContext>,
    ) -> SessionResult<SessionId> {
        self.generate_session(
            user_dn,
            None,
            SessionIdState::Unauthenticated,
            attributes,
            persist,
            ctx,
        )
        .await
    }

    /// Creates a session in `state` with an explicit authentication time.
    ///
    /// An authenticated session without `authentication_time` is stamped
    /// with the current time. Authenticated sessions go through the session
    /// listeners; unauthenticated ones fire an `UNAUTHENTICATED` event.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSessionState`] if an authenticated
    /// session has no subject (outside UMA) or a listener rejects it, and
    /// an error if `session_state` or the JWT cannot be computed.
    pub async fn generate_session(
        &self,
        user_dn: Option<&str>,
        authentication_time: Option<DateTime<Utc>>,
        state: SessionIdState,
        attributes: HashMap<String, String>,
        persist: bool,
        ctx: Option<&RequestContext>,
    ) -> SessionResult<SessionId> {
        let mut session = self
            .create_session(user_dn, authentication_time, state, attributes, persist, ctx)
            .await?;

        match state {
            SessionIdState::Authenticated => self.start_session(&mut session, ctx).await?,
            SessionIdState::Unauthenticated => self.events.dispatch(
                SessionEvent::new(SessionEventType::Unauthenticated, &session).with_context(ctx),
            ),
        }
        Ok(session)
    }

    async fn create_session(
        &self,
        user_dn: Option<&str>,
        authentication_time: Option<DateTime<Utc>>,
        state: SessionIdState,
        mut attributes: HashMap<String, String>,
        persist: bool,
        ctx: Option<&RequestContext>,
    ) -> SessionResult<SessionId> {
        let user_dn = user_dn.filter(|dn| !dn.trim().is_empty());
        if state == SessionIdState::Authenticated
            && user_dn.is_none()
            && !attributes.contains_key(attrs::UMA)
        {
            return Err(SessionError::InvalidSessionState(
                "an authenticated session requires a subject".to_string(),
            ));
        }

        let opbs = random::generate_browser_state();
        let session_state = self.codec.generate(
            attributes.get(attrs::CLIENT_ID).map(String::as_str),
            attributes.get(attrs::REDIRECT_URI).map(String::as_str),
            &opbs,
        )?;
        attributes.insert(attrs::OP_BROWSER_STATE.to_string(), opbs);

        let mut session = SessionId::new(
            random::generate_session_id(),
            random::generate_session_id(),
            &self.config.sessions_base_dn,
        );
        session.user_dn = user_dn.map(ToString::to_string);
        session.state = state;
        session.session_state = Some(session_state);
        session.set_attributes(attributes);
        session.authentication_time = match state {
            SessionIdState::Authenticated => authentication_time.or_else(|| Some(Utc::now())),
            SessionIdState::Unauthenticated => authentication_time,
        };
        session.is_jwt = self.config.session_as_jwt;
        self.stamp(&mut session);

        if session.is_jwt {
            self.sign(&mut session)?;
        }

        let persisted = persist
            && self.policy.should_persist(&session, false)
            && self.write_new(&mut session).await;
        self.events.audit(&session, ctx);

        tracing::trace!(
            session_id = %session.id(),
            state = %session.state,
            as_jwt = session.is_jwt,
            persisted,
            "Generated new session"
        );
        Ok(session)
    }

    /// Marks `session` authenticated for `user_dn`.
    ///
    /// With identifier rotation enabled and a cookie writer in `ctx`, the
    /// old entry is removed, the session gets a fresh identifier (recorded
    /// as `old_session_id`), is persisted, and is handed to the cookie
    /// writer. Otherwise the session is updated in place.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSessionState`] if a listener rejects
    /// the session, or a signing error.
    pub async fn set_session_state_authenticated(
        &self,
        mut session: SessionId,
        user_dn: &str,
        ctx: Option<&RequestContext>,
    ) -> SessionResult<SessionId> {
        session.user_dn = Some(user_dn.to_string());
        session.authentication_time = Some(Utc::now());
        session.state = SessionIdState::Authenticated;

        let rotate_with = ctx
            .and_then(|ctx| ctx.cookie_writer.as_ref())
            .filter(|_| self.config.change_session_id_on_authentication);

        let persisted = if let Some(writer) = rotate_with {
            let new_id = random::generate_session_id();
            tracing::debug!(old_id = %session.id(), new_id = %new_id, "Changing session id");

            self.remove(&session).await;
            let old_id = session.rotate_id(new_id);
            session.set_attribute(attrs::OLD_SESSION_ID, old_id);
            self.stamp(&mut session);
            if session.is_jwt {
                self.sign(&mut session)?;
            }

            let persisted = self.write_new(&mut session).await;
            writer.write_session_cookie(&session);
            persisted
        } else {
            if session.is_jwt {
                self.sign(&mut session)?;
            }
            self.update_session(&mut session, true, true, true).await
        };

        self.events.audit(&session, ctx);
        tracing::trace!(
            session_id = %session.id(),
            state = %session.state,
            persisted,
            "Authenticated session"
        );

        self.start_session(&mut session, ctx).await?;
        Ok(session)
    }

    async fn start_session(
        &self,
        session: &mut SessionId,
        ctx: Option<&RequestContext>,
    ) -> SessionResult<()> {
        if self.events.start_session(session, ctx).await {
            self.events.dispatch(
                SessionEvent::new(SessionEventType::Authenticated, session).with_context(ctx),
            );
            return Ok(());
        }

        tracing::info!(
            session_id = %session.id(),
            user = ?session.attribute(attrs::AUTHENTICATED_USER),
            "Session start rejected by listener"
        );
        let parameters = ctx.map(|ctx| ctx.parameters.clone()).unwrap_or_default();
        self.reinit_login(session, &parameters, true).await?;
        Err(SessionError::InvalidSessionState(
            "session creation is prohibited by a session listener".to_string(),
        ))
    }

    fn sign(&self, session: &mut SessionId) -> SessionResult<()> {
        let encoder = self.jwt.as_ref().ok_or(SignatureError::NoActiveKey)?;
        session.jwt = Some(encoder.encode(session)?);
        Ok(())
    }

    // === Writes ===

    /// Writes a new session if it qualifies for persistence or `force` is set.
    ///
    /// Returns whether the session was written. Failures are logged.
    pub async fn persist_session(&self, session: &mut SessionId, force: bool) -> bool {
        if !self.policy.should_persist(session, force) {
            return false;
        }

        self.stamp(session);
        if session.is_jwt {
            if let Err(e) = self.sign(session) {
                tracing::error!(session_id = %session.id(), error = %e, "Failed to sign session");
                return false;
            }
        }

        self.write_new(session).await
    }

    fn stamp(&self, session: &mut SessionId) {
        session.last_used_at = Some(Utc::now());
        self.policy.apply_expiration(session);
    }

    async fn write_new(&self, session: &mut SessionId) -> bool {
        if let Err(e) = self.store.persist(session).await {
            tracing::error!(
                session_id = %session.id(),
                backend = self.store.name(),
                error = %e,
                "Failed to persist session"
            );
            return false;
        }

        session.persisted = true;
        self.local.put(session.dn(), session.clone());
        true
    }

    /// Refreshes and writes back a session.
    ///
    /// Sessions that do not qualify for persistence (and are not forced)
    /// stay request-local and report success. A session idle beyond its
    /// unused lifetime or past its absolute lifetime is removed and reports
    /// failure. `last_used_at` is only refreshed when older than the
    /// configured debounce.
    pub async fn update_session(
        &self,
        session: &mut SessionId,
        update_last_used_at: bool,
        force_update: bool,
        modified: bool,
    ) -> bool {
        if !self.policy.should_persist(session, force_update) {
            return true;
        }

        let now = Utc::now();
        let mut update = modified;

        if update_last_used_at {
            match session.last_used_at {
                Some(last_used_at) if self.policy.idle_exceeded(last_used_at, now) => {
                    tracing::debug!(session_id = %session.id(), "Session unused for too long, removing it");
                    self.remove(session).await;
                    return false;
                }
                Some(last_used_at)
                    if (now - last_used_at).num_milliseconds()
                        <= self.config.last_used_at_debounce_ms => {}
                _ => {
                    update = true;
                    session.last_used_at = Some(now);
                }
            }
        }

        if !session.persisted {
            update = true;
            session.persisted = true;
        }

        if self.policy.is_expired(session, now) {
            tracing::debug!(session_id = %session.id(), "Session lifetime exceeded, removing it");
            self.remove(session).await;
            return false;
        }

        if !update {
            return true;
        }

        match self.merge_with_retry(session).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(session_id = %session.id(), error = %e, "Failed to update session");
                false
            }
        }
    }

    /// Writes back a session, retrying on write conflicts.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Expired`] for a session past its absolute
    /// lifetime, [`SessionError::NotFound`] if the entry is gone,
    /// [`SessionError::Conflict`] when every attempt conflicted and
    /// [`SessionError::Storage`] on any other backend failure.
    pub async fn merge_with_retry(&self, session: &mut SessionId) -> SessionResult<()> {
        if self.policy.is_expired(session, Utc::now()) {
            return Err(SessionError::Expired(session.id().to_string()));
        }

        self.policy.apply_expiration(session);
        if session.is_jwt {
            self.sign(session)?;
        }

        let attempts = self.config.max_merge_attempts.max(1);
        let mut last = None;

        for attempt in 1..=attempts {
            match self.store.merge(session).await {
                Ok(()) => {
                    self.local.put(session.dn(), session.clone());
                    self.events
                        .dispatch(SessionEvent::new(SessionEventType::Updated, session));
                    return Ok(());
                }
                Err(e) if e.is_conflict() => {
                    tracing::warn!(
                        session_id = %session.id(),
                        attempt,
                        error = %e,
                        "Session merge conflict"
                    );
                    last = Some(e);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(SessionError::Conflict {
            id: session.id().to_string(),
            attempts,
            last: last.as_ref().map(ToString::to_string).unwrap_or_default(),
        })
    }

    /// Removes a session from the backend and the local cache.
    ///
    /// Returns whether the backend removal succeeded. Failures are logged.
    pub async fn remove(&self, session: &SessionId) -> bool {
        self.local.remove(session.dn());

        if let Err(e) = self.store.remove(session.dn()).await {
            tracing::error!(
                session_id = %session.id(),
                backend = self.store.name(),
                error = %e,
                "Failed to remove session"
            );
            return false;
        }

        self.events
            .dispatch(SessionEvent::new(SessionEventType::Gone, session));
        true
    }

    /// Removes every session in `sessions`. Returns how many were removed.
    pub async fn remove_all(&self, sessions: &[SessionId]) -> usize {
        let mut removed = 0;
        for session in sessions {
            if self.remove(session).await {
                removed += 1;
            }
        }
        removed
    }

    // === Validity ===

    /// Returns whether the session is within its unused lifetimes.
    #[must_use]
    pub fn is_session_valid(&self, session: &SessionId) -> bool {
        self.policy.is_valid(session, Utc::now())
    }

    /// Returns whether the session is past its absolute lifetime.
    #[must_use]
    pub fn is_expired(&self, session: &SessionId) -> bool {
        self.policy.is_expired(session, Utc::now())
    }

    // === Protocol state ===

    /// Returns the `session_state` for a request from `client_id` with
    /// `redirect_uri`.
    ///
    /// The stored value is reused only when both match what the session is
    /// bound to; otherwise a new value is derived with a fresh salt.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidRedirectUri`] if the URI cannot be parsed.
    pub fn compute_session_state(
        &self,
        session: &SessionId,
        client_id: &str,
        redirect_uri: &str,
    ) -> SessionResult<String> {
        let same_client =
            session.client_id() == Some(client_id) && session.redirect_uri() == Some(redirect_uri);
        if let Some(session_state) = session.session_state.as_ref().filter(|_| same_client) {
            return Ok(session_state.clone());
        }

        self.codec.generate(
            Some(client_id),
            Some(redirect_uri),
            session.op_browser_state().unwrap_or_default(),
        )
    }

    /// Checks that an authenticated session may serve a request asking for
    /// `acr_values`.
    ///
    /// A request for the session's own ACR (or for none) reconciles the
    /// session with the request parameters. A request for other methods the
    /// session outranks leaves it untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::StepUpRequired`] if a requested method
    /// outranks the session's and [`SessionError::AcrUnavailable`] if one is
    /// disabled.
    pub async fn assert_authenticated_session_corresponds_to_new_request(
        &self,
        mut session: SessionId,
        acr_values: Option<&str>,
        ctx: Option<&RequestContext>,
    ) -> SessionResult<SessionId> {
        if !session.is_authenticated() || session.attributes().is_empty() {
            return Ok(session);
        }

        let Some(session_acr) = self.get_acr(&session) else {
            tracing::trace!(session_id = %session.id(), "No acr recorded on session");
            return Ok(session);
        };

        let requested = acr_values_list(acr_values.unwrap_or_default());
        match check_acr(&session_acr, &requested, &*self.acr)? {
            AcrCheck::Satisfied => Ok(session),
            AcrCheck::Unchanged => {
                let empty = HashMap::new();
                let parameters = ctx.map_or(&empty, |ctx| &ctx.parameters);
                self.reinit_login(&mut session, parameters, false).await?;
                Ok(session)
            }
        }
    }

    /// Restarts the login flow of `session` with the current request's
    /// parameters.
    ///
    /// Unless forced, nothing happens when the parameters (ignoring the RP
    /// `state`) already match the session. A forced reinit also resets the
    /// session to unauthenticated. Returns whether the session was written.
    ///
    /// # Errors
    ///
    /// Returns a signing error if the snapshot of a JWT session cannot be
    /// re-encoded.
    pub async fn reinit_login(
        &self,
        session: &mut SessionId,
        request_parameters: &HashMap<String, String>,
        force: bool,
    ) -> SessionResult<bool> {
        let mut current = session.attributes_snapshot();
        for (name, value) in request_parameters {
            if !name.eq_ignore_ascii_case(attrs::AUTH_STEP) {
                current.insert(name.clone(), value.clone());
            }
        }

        if !force && !attributes_differ(session.attributes(), &current) {
            return Ok(false);
        }

        session.set_attributes(current);
        session.clear_passed_steps();
        session.set_attribute(attrs::AUTH_STEP, "1");

        if force {
            session.force_unauthenticated();
            self.events.dispatch(SessionEvent::new(
                SessionEventType::Unauthenticated,
                session,
            ));
        }
        if session.is_jwt {
            self.sign(session)?;
        }

        let updated = self.update_session(session, true, true, true).await;
        if !updated {
            tracing::debug!(session_id = %session.id(), "Failed to update session entry");
        }
        Ok(updated)
    }

    /// Rewinds a multi-step login to `step` and writes the session back.
    ///
    /// Returns `None` if the write failed.
    pub async fn reset_to_step(&self, mut session: SessionId, step: u32) -> Option<SessionId> {
        session.reset_to_step(step);

        if self.update_session(&mut session, true, true, true).await {
            Some(session)
        } else {
            tracing::debug!(session_id = %session.id(), "Failed to update session entry");
            None
        }
    }
}

fn attributes_differ(session: &HashMap<String, String>, current: &HashMap<String, String>) -> bool {
    let relevant = |attributes: &HashMap<String, String>| {
        attributes
            .iter()
            .filter(|(name, _)| name.as_str() != attrs::STATE)
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect::<HashMap<_, _>>()
    };
    relevant(session) != relevant(current)
}

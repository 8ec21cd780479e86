//! Expiration and validity policy.

use chrono::{DateTime, Duration, Utc};
use ox_core::SessionConfig;
use ox_core::config::{DEFAULT_SESSION_ID_LIFETIME, LIFETIME_DISABLED};

use crate::model::{Prompt, SessionId, SessionIdState};

/// Lifetime used when both lifetime settings explicitly disable the limit.
pub const UNBOUNDED_LIFETIME: i64 = 2_147_483_647;

/// TTL and liveness decisions derived from [`SessionConfig`].
#[derive(Debug, Clone)]
pub struct ExpirationPolicy {
    server_session_id_lifetime: Option<i64>,
    session_id_lifetime: Option<i64>,
    unused_lifetime: i64,
    unauthenticated_unused_lifetime: i64,
    persist_on_prompt_none: bool,
}

impl ExpirationPolicy {
    /// Creates a policy from configuration.
    #[must_use]
    pub const fn new(config: &SessionConfig) -> Self {
        Self {
            server_session_id_lifetime: config.server_session_id_lifetime,
            session_id_lifetime: config.session_id_lifetime,
            unused_lifetime: config.session_id_unused_lifetime,
            unauthenticated_unused_lifetime: config.session_id_unauthenticated_unused_lifetime,
            persist_on_prompt_none: config.session_id_persist_on_prompt_none,
        }
    }

    /// Returns the absolute lifetime of an authenticated session in seconds.
    ///
    /// The server lifetime wins when positive, then the general lifetime.
    /// When both are set and non-positive the lifetime is unbounded;
    /// otherwise [`DEFAULT_SESSION_ID_LIFETIME`] applies.
    #[must_use]
    pub fn server_session_lifetime(&self) -> i64 {
        match (self.server_session_id_lifetime, self.session_id_lifetime) {
            (Some(server), _) if server > 0 => server,
            (_, Some(general)) if general > 0 => general,
            (Some(_), Some(_)) => UNBOUNDED_LIFETIME,
            _ => {
                tracing::debug!("Session lifetime is not configured, using default");
                DEFAULT_SESSION_ID_LIFETIME
            }
        }
    }

    /// Returns the unused lifetime of authenticated sessions in seconds.
    #[must_use]
    pub const fn unused_lifetime(&self) -> i64 {
        self.unused_lifetime
    }

    /// Returns `(expiration_date, ttl_seconds)` for a session created at
    /// `creation_date` in `state`.
    ///
    /// A non-positive `ttl` keeps its value but the expiration date is
    /// pushed out by [`UNBOUNDED_LIFETIME`].
    #[must_use]
    pub fn expiration_for(
        &self,
        creation_date: DateTime<Utc>,
        state: SessionIdState,
    ) -> (DateTime<Utc>, i64) {
        let ttl = match state {
            SessionIdState::Unauthenticated => self.unauthenticated_unused_lifetime,
            SessionIdState::Authenticated => self.server_session_lifetime(),
        };
        let lifetime = if ttl > 0 { ttl } else { UNBOUNDED_LIFETIME };
        let expiration = creation_date
            .checked_add_signed(Duration::seconds(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        (expiration, ttl)
    }

    /// Recomputes `expiration_date` and `ttl` on `session`.
    pub fn apply_expiration(&self, session: &mut SessionId) {
        let (expiration, ttl) = self.expiration_for(session.creation_date, session.state);
        session.expiration_date = expiration;
        session.ttl = ttl;
    }

    /// Returns whether the absolute lifetime since authentication is exceeded.
    ///
    /// Sessions that never authenticated do not expire by lifetime.
    #[must_use]
    pub fn is_expired(&self, session: &SessionId, now: DateTime<Utc>) -> bool {
        session
            .authentication_time
            .is_some_and(|auth| (now - auth).num_seconds() > self.server_session_lifetime())
    }

    /// Returns whether the session is still within its unused lifetimes.
    ///
    /// A threshold of [`LIFETIME_DISABLED`] skips that check.
    #[must_use]
    pub fn is_valid(&self, session: &SessionId, now: DateTime<Utc>) -> bool {
        let idle = now - session.last_used_at.unwrap_or(session.creation_date);

        if self.unused_lifetime != LIFETIME_DISABLED
            && idle > Duration::seconds(self.unused_lifetime)
        {
            return false;
        }

        !(session.state == SessionIdState::Unauthenticated
            && self.unauthenticated_unused_lifetime != LIFETIME_DISABLED
            && idle > Duration::seconds(self.unauthenticated_unused_lifetime))
    }

    /// Returns whether the session's idle time exceeds the unused lifetime.
    ///
    /// Used by the update path, which measures whole seconds since the
    /// stored `last_used_at`.
    #[must_use]
    pub fn idle_exceeded(&self, last_used_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.unused_lifetime != LIFETIME_DISABLED
            && (now - last_used_at).num_seconds() > self.unused_lifetime
    }

    /// Returns whether a session with these prompts is written to its backend.
    ///
    /// `prompt=none` sessions are only persisted when configured to be.
    #[must_use]
    pub fn is_persisted(&self, prompts: &[Prompt]) -> bool {
        self.persist_on_prompt_none || !prompts.contains(&Prompt::None)
    }

    /// Returns whether `session` qualifies for persistence.
    #[must_use]
    pub fn should_persist(&self, session: &SessionId, force: bool) -> bool {
        force || (self.unused_lifetime > 0 && self.is_persisted(&session.prompts()))
    }
}

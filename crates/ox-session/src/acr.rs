//! Step-up authentication guard.
//!
//! A session authenticated with one ACR may be reused by a request asking
//! for others. The guard compares assurance levels: a stronger request
//! needs step-up, an unknown method is unavailable, and a weaker or equal
//! request keeps the stronger session untouched.

use dashmap::DashMap;

use crate::error::{SessionError, SessionResult};

/// Maps authentication methods to assurance levels.
///
/// A method without a level is disabled.
pub trait AcrLevelResolver: Send + Sync {
    /// Resolves an ACR alias to the name of the method that serves it.
    fn script_name(&self, acr: &str) -> String {
        acr.to_string()
    }

    /// Returns the level of an enabled method.
    fn level(&self, method: &str) -> Option<i32>;

    /// Returns the level of the method serving `acr`.
    fn acr_level(&self, acr: &str) -> Option<i32> {
        self.level(&self.script_name(acr))
    }
}

/// In-process [`AcrLevelResolver`] backed by concurrent maps.
#[derive(Debug, Default)]
pub struct StaticAcrLevels {
    levels: DashMap<String, i32>,
    aliases: DashMap<String, String>,
}

impl StaticAcrLevels {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables `method` at `level`.
    #[must_use]
    pub fn with_level(self, method: impl Into<String>, level: i32) -> Self {
        self.levels.insert(method.into(), level);
        self
    }

    /// Serves `alias` with `method`.
    #[must_use]
    pub fn with_alias(self, alias: impl Into<String>, method: impl Into<String>) -> Self {
        self.aliases.insert(alias.into(), method.into());
        self
    }

    /// Disables `method`.
    pub fn disable(&self, method: &str) {
        self.levels.remove(method);
    }
}

impl AcrLevelResolver for StaticAcrLevels {
    fn script_name(&self, acr: &str) -> String {
        self.aliases
            .get(acr)
            .map_or_else(|| acr.to_string(), |method| method.value().clone())
    }

    fn level(&self, method: &str) -> Option<i32> {
        self.levels.get(method).map(|level| *level)
    }
}

/// Parses requested ACR values.
///
/// Accepts a JSON array of strings or space separated tokens.
#[must_use]
pub fn acr_values_list(acr_values: &str) -> Vec<String> {
    let trimmed = acr_values.trim();
    if trimmed.starts_with('[') {
        if let Ok(values) = serde_json::from_str::<Vec<String>>(trimmed) {
            return values;
        }
    }
    trimmed.split_whitespace().map(ToString::to_string).collect()
}

/// Outcome of comparing a session's ACR with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcrCheck {
    /// The request accepts the session's ACR (or asks for none).
    Unchanged,
    /// The request asks for other methods the session already outranks.
    Satisfied,
}

/// Compares the session's ACR with the requested values.
///
/// # Errors
///
/// Returns [`SessionError::AcrUnavailable`] if a requested method is
/// disabled and [`SessionError::StepUpRequired`] if one outranks the
/// session's method.
pub fn check_acr(
    session_acr: &str,
    requested: &[String],
    resolver: &dyn AcrLevelResolver,
) -> SessionResult<AcrCheck> {
    if requested.is_empty() || requested.iter().any(|acr| acr == session_acr) {
        return Ok(AcrCheck::Unchanged);
    }

    let session_level = resolver.acr_level(session_acr);
    for acr in requested {
        let level = resolver.acr_level(acr);
        tracing::info!(
            session_acr,
            ?session_level,
            requested_acr = %acr,
            requested_level = ?level,
            "Acr changed"
        );

        let Some(level) = level else {
            return Err(SessionError::AcrUnavailable(acr.clone()));
        };

        if session_level.is_none_or(|current| current < level) {
            return Err(SessionError::StepUpRequired {
                session_acr: session_acr.to_string(),
                requested: acr.clone(),
            });
        }
    }

    Ok(AcrCheck::Satisfied)
}

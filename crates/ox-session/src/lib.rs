//! # ox-session
//!
//! Session-state core of the OpenID Provider.
//!
//! A session ties a browser to an end-user across authorization requests.
//! This crate owns its lifecycle:
//!
//! - [`SessionId`] - The session entity, its attributes and login steps
//! - [`SessionService`] - Creation, authentication, lookup, update and removal
//! - [`ExpirationPolicy`] - Absolute and unused lifetimes
//! - [`SessionStateCodec`] - OIDC Session Management `session_state` values
//! - [`SessionJwtEncoder`] - Signed session snapshots
//! - [`SessionStore`] - Backend port with cache and directory adapters
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ox_core::SessionConfig;
//! use ox_session::SessionService;
//! use ox_storage::InMemoryDirectory;
//!
//! let service = SessionService::builder(SessionConfig::from_env()?)
//!     .directory_backend(Arc::new(InMemoryDirectory::new()))
//!     .build()?;
//!
//! let session = service
//!     .generate_unauthenticated_session(None, attributes, true, Some(&ctx))
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod acr;
pub mod context;
pub mod error;
pub mod events;
pub mod jwt;
pub mod model;
pub mod policy;
pub mod service;
pub mod state_token;
pub mod store;

pub use acr::{AcrLevelResolver, StaticAcrLevels};
pub use context::{RequestContext, SessionCookieWriter};
pub use error::{SessionError, SessionResult};
pub use events::{
    AuditSink, EventDispatcher, SessionEvent, SessionEventType, SessionListener, TracingAuditSink,
};
pub use jwt::{KeyRing, SessionClaims, SessionJwtEncoder, SessionSigningKey, SigningKeyProvider};
pub use model::{Prompt, SessionId, SessionIdState, attrs};
pub use policy::ExpirationPolicy;
pub use service::{SessionService, SessionServiceBuilder};
pub use state_token::SessionStateCodec;
pub use store::{
    CacheSessionStore, DirectorySessionStore, SessionStore, StoreError, StoreResult,
};

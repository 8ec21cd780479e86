//! # ox-core
//!
//! Core configuration, error handling and audit records shared by the
//! session crates.
//!
//! ## Modules
//!
//! - [`config`] - Session lifetime and persistence settings
//! - [`error`] - Core error type
//! - [`event`] - Audit records for session lifecycle transitions

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod event;

pub use config::SessionConfig;
pub use error::{Error, Result};
pub use event::{AuditAction, AuditRecord};

//! # ox-storage-sql
//!
//! `SQLx`-based directory provider for session entries.
//!
//! This crate provides `PostgreSQL` storage using `SQLx`. Entries live in a
//! single `ox_sessions` table keyed by DN; the `version` column backs the
//! optimistic merge.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod convert;
mod entities;
pub mod error;
pub mod pool;
pub mod session;

pub use pool::{PoolConfig, create_pool, run_migrations};
pub use session::PgDirectoryProvider;

//! End-to-End Integration Tests
//!
//! These tests drive the session service against the in-process backends.
//! The PostgreSQL and Redis suites run only when `OX_TEST_DATABASE_URL` or
//! `OX_TEST_REDIS_ENDPOINT` is set.

mod common;
mod acr_flows;
mod backends;
mod concurrency;
mod expiration;
mod jwt_sessions;

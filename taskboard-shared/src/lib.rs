//! # Taskboard Shared Library
//!
//! Domain logic for the Taskboard API: accounts with brute-force lockout,
//! tasks and their assignments.
//!
//! ## Module Organization
//!
//! - `models`: Database rows and their queries
//! - `store`: Persistence trait with PostgreSQL and in-memory backends
//! - `db`: Connection pool and migrations
//! - `auth`: Password hashing, login throttle and the auth service
//! - `tasks`: Task assignment service
//! - `validation`: Input rules
//! - `error`: Domain error taxonomy

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod store;
pub mod tasks;
pub mod validation;

/// Current version of the Taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

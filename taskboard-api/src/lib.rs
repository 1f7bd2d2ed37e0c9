//! # Taskboard API Server Library
//!
//! HTTP surface over the account and task services in `taskboard-shared`.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration from the environment
//! - `error`: Error envelope and HTTP status mapping
//! - `middleware`: Security response headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;

//! Common library for the users service
//!
//! This crate provides the PostgreSQL plumbing shared by the service
//! binaries: pool configuration, connection setup, health checks and the
//! database error type.

pub mod database;
pub mod error;

pub use database::{DatabaseConfig, health_check, init_pool};
pub use error::{DatabaseError, DatabaseResult};

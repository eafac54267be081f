//! User accounts service
//!
//! REST endpoints for managing users, guarded by JWT bearer tokens and a
//! per-route role allow-list.
//!
//! ```text
//! request → guards (token → roles) → handler → service → UserStore
//! ```
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use users::{
//!     jwt::{JwtConfig, JwtService},
//!     rate_limiter::{RateLimiter, RateLimiterConfig},
//!     repositories::InMemoryUserStore,
//!     routes::create_router,
//!     state::AppState,
//! };
//!
//! # fn main() -> anyhow::Result<()> {
//! let jwt = JwtService::new(&JwtConfig {
//!     secret: "a-secret-of-at-least-thirty-two-bytes".to_string(),
//!     expiry_seconds: 3600,
//! })?;
//! let state = AppState::new(
//!     Arc::new(InMemoryUserStore::new()),
//!     jwt,
//!     RateLimiter::new(RateLimiterConfig::default()),
//! );
//! let router = create_router(state);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod guards;
pub mod handlers;
pub mod jwt;
pub mod models;
pub mod password;
pub mod rate_limiter;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod validation;

pub use routes::create_router;
pub use state::AppState;

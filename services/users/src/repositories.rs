//! Data access for users
//!
//! Services depend only on the [`UserStore`] trait. Two implementations
//! exist: [`postgres::PgUserStore`] for deployments and
//! [`memory::InMemoryUserStore`] for development and tests.

use async_trait::async_trait;
use common::DatabaseError;
use thiserror::Error;

use crate::models::{NewUserRecord, User};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryUserStore;
pub use postgres::PgUserStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Username uniqueness was violated
    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    /// Stored data could not be mapped back into a user
    #[error("Corrupt user row {id}: {reason}")]
    CorruptRow { id: i64, reason: String },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence interface for user records
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user and return it with its assigned id
    async fn insert(&self, user: NewUserRecord) -> StoreResult<User>;

    /// All users ordered by id, i.e. insertion order
    async fn list(&self) -> StoreResult<Vec<User>>;

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>>;

    /// First user (lowest id) with this email
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Overwrite the mutable fields of an existing user
    ///
    /// Returns `None` when no row has `user.id`.
    async fn update(&self, user: &User) -> StoreResult<Option<User>>;

    /// Delete a user; `false` when it did not exist
    async fn delete(&self, id: i64) -> StoreResult<bool>;

    /// Whether the backing store can serve requests
    async fn health_check(&self) -> StoreResult<bool>;
}

//! Business logic sitting between the handlers and the store

pub mod auth;
pub mod users;

pub use auth::{AuthError, AuthService};
pub use users::{UserError, UsersService};

//! Application state shared across handlers

use std::sync::Arc;

use crate::{
    jwt::JwtService,
    rate_limiter::RateLimiter,
    repositories::UserStore,
    services::{AuthService, UsersService},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub users: UsersService,
    pub auth: AuthService,
    pub login_limiter: RateLimiter,
}

impl AppState {
    /// Wire the services around one store and token signer
    pub fn new(store: Arc<dyn UserStore>, jwt: JwtService, login_limiter: RateLimiter) -> Self {
        Self {
            users: UsersService::new(store.clone()),
            auth: AuthService::new(store.clone(), jwt),
            store,
            login_limiter,
        }
    }
}

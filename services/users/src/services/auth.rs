//! Auth service: local credential checks and token issuance

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::jwt::{AccessToken, JwtService};
use crate::models::UserResponse;
use crate::password::{self, PasswordError};
use crate::repositories::{StoreError, UserStore};

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown username or wrong password; deliberately not distinguished
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Failed to issue token: {0}")]
    TokenIssue(String),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    jwt: JwtService,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, jwt: JwtService) -> Self {
        Self { store, jwt }
    }

    /// Check a username/password pair against the stored hash
    pub async fn validate_user(&self, username: &str, password: &str) -> AuthResult<UserResponse> {
        let user = self.store.find_by_username(username).await?;
        let stored_hash = user.as_ref().map(|user| user.password_hash.as_str());
        let matched = password::verify_credentials(password, stored_hash)?;

        let user = match user {
            Some(user) if matched => user,
            Some(user) => {
                debug!(user_id = user.id, "Login with wrong password");
                return Err(AuthError::InvalidCredentials);
            }
            None => {
                debug!(username, "Login for unknown user");
                return Err(AuthError::InvalidCredentials);
            }
        };

        Ok(user.into())
    }

    /// Issue a signed access token for an authenticated user
    pub fn login(&self, user: &UserResponse) -> AuthResult<AccessToken> {
        let token = self
            .jwt
            .generate_access_token(user)
            .map_err(|e| AuthError::TokenIssue(e.to_string()))?;

        info!(user_id = user.id, "Issued access token");
        Ok(token)
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }
}

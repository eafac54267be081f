//! Users service: CRUD and role mutation over a [`UserStore`]

use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::BootstrapAdmin;
use crate::models::{CreateUser, NewUserRecord, Role, UpdateUser, User, UserResponse};
use crate::password::{self, PasswordError};
use crate::repositories::{StoreError, UserStore};
use crate::validation::{self, ValidationError};

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User with id {0} not found")]
    NotFound(i64),

    #[error("User with email '{0}' not found")]
    EmailNotFound(String),

    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for UserError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UsernameTaken(username) => UserError::UsernameTaken(username),
            other => UserError::Store(other),
        }
    }
}

pub type UserResult<T> = Result<T, UserError>;

/// Service layer for user management
#[derive(Clone)]
pub struct UsersService {
    store: Arc<dyn UserStore>,
}

impl UsersService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Create a new user with a hashed password
    pub async fn create(&self, input: CreateUser) -> UserResult<UserResponse> {
        validation::validate_new_user(&input)?;

        if self.store.find_by_username(&input.username).await?.is_some() {
            return Err(UserError::UsernameTaken(input.username));
        }

        let password_hash = password::hash_password(&input.password)?;
        let roles = input.roles.unwrap_or_else(|| BTreeSet::from([Role::User]));

        let user = self
            .store
            .insert(NewUserRecord {
                username: input.username,
                password_hash,
                first_name: input.first_name,
                last_name: input.last_name,
                email: input.email,
                roles,
            })
            .await?;

        info!(user_id = user.id, username = %user.username, "Created user");
        Ok(user.into())
    }

    /// All users in insertion order
    pub async fn find_all(&self) -> UserResult<Vec<UserResponse>> {
        let users = self.store.list().await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    pub async fn find_by_email(&self, email: &str) -> UserResult<UserResponse> {
        self.store
            .find_by_email(email)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| UserError::EmailNotFound(email.to_string()))
    }

    pub async fn find_by_id(&self, id: i64) -> UserResult<UserResponse> {
        Ok(self.load(id).await?.into())
    }

    /// Apply a partial update; absent fields keep their value
    pub async fn update(&self, id: i64, input: UpdateUser) -> UserResult<UserResponse> {
        validation::validate_update(&input)?;

        let mut user = self.load(id).await?;

        if input.is_empty() {
            debug!(user_id = id, "Empty update, nothing to write");
            return Ok(user.into());
        }

        if let Some(username) = input.username {
            if username != user.username {
                if self.store.find_by_username(&username).await?.is_some() {
                    return Err(UserError::UsernameTaken(username));
                }
                user.username = username;
            }
        }
        if let Some(password) = input.password {
            user.password_hash = password::hash_password(&password)?;
        }
        if let Some(first_name) = input.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = input.last_name {
            user.last_name = last_name;
        }
        if let Some(email) = input.email {
            user.email = email;
        }

        let updated = self.save(user).await?;
        info!(user_id = id, "Updated user");
        Ok(updated.into())
    }

    pub async fn remove(&self, id: i64) -> UserResult<()> {
        if !self.store.delete(id).await? {
            return Err(UserError::NotFound(id));
        }
        info!(user_id = id, "Deleted user");
        Ok(())
    }

    /// Grant a role; granting a held role is a successful no-op
    pub async fn add_role(&self, id: i64, role: Role) -> UserResult<UserResponse> {
        let mut user = self.load(id).await?;

        if !user.roles.insert(role) {
            return Ok(user.into());
        }

        let updated = self.save(user).await?;
        info!(user_id = id, %role, "Granted role");
        Ok(updated.into())
    }

    /// Revoke a role; revoking an unheld role is a successful no-op
    pub async fn remove_role(&self, id: i64, role: Role) -> UserResult<UserResponse> {
        let mut user = self.load(id).await?;

        if !user.roles.remove(&role) {
            return Ok(user.into());
        }

        let updated = self.save(user).await?;
        info!(user_id = id, %role, "Revoked role");
        Ok(updated.into())
    }

    /// Roles currently held by a user, or `None` when it does not exist
    pub async fn roles_of(&self, id: i64) -> UserResult<Option<BTreeSet<Role>>> {
        Ok(self.store.find_by_id(id).await?.map(|user| user.roles))
    }

    /// Create the configured administrator unless its username exists
    ///
    /// Returns `true` when an account was created.
    pub async fn ensure_admin(&self, admin: &BootstrapAdmin) -> UserResult<bool> {
        if self.store.find_by_username(&admin.username).await?.is_some() {
            return Ok(false);
        }

        let created = self
            .create(CreateUser {
                username: admin.username.clone(),
                password: admin.password.clone(),
                first_name: admin.first_name.clone(),
                last_name: admin.last_name.clone(),
                email: admin.email.clone(),
                roles: Some(BTreeSet::from([Role::Admin, Role::User])),
            })
            .await?;

        info!(user_id = created.id, username = %created.username, "Bootstrapped administrator");
        Ok(true)
    }

    async fn load(&self, id: i64) -> UserResult<User> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))
    }

    async fn save(&self, user: User) -> UserResult<User> {
        let id = user.id;
        self.store
            .update(&user)
            .await?
            .ok_or(UserError::NotFound(id))
    }
}

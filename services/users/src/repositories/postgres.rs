//! PostgreSQL user store

use async_trait::async_trait;
use common::DatabaseError;
use sqlx::{PgPool, Row, migrate::Migrator, postgres::PgRow};
use std::collections::BTreeSet;
use tracing::{info, warn};

use super::{StoreError, StoreResult, UserStore};
use crate::models::{NewUserRecord, Role, User};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const USER_COLUMNS: &str = "id, username, password_hash, first_name, last_name, email, roles";

/// User store backed by the `users` table
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new user store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> StoreResult<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;
        info!("User schema migrations applied");
        Ok(())
    }
}

fn roles_to_column(roles: &BTreeSet<Role>) -> Vec<String> {
    roles.iter().map(|role| role.as_str().to_string()).collect()
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    let id: i64 = row.get("id");
    let raw_roles: Vec<String> = row.get("roles");

    let roles = raw_roles
        .iter()
        .map(|raw| raw.parse::<Role>())
        .collect::<Result<BTreeSet<_>, _>>()
        .map_err(|e| StoreError::CorruptRow {
            id,
            reason: e.to_string(),
        })?;

    Ok(User {
        id,
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        roles,
    })
}

/// Map a write error, surfacing a username conflict as its own variant.
fn write_error(err: sqlx::Error, username: &str) -> StoreError {
    match DatabaseError::from_query(err) {
        DatabaseError::UniqueViolation { .. } => StoreError::UsernameTaken(username.to_string()),
        other => StoreError::Database(other),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: NewUserRecord) -> StoreResult<User> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (username, password_hash, first_name, last_name, email, roles)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(roles_to_column(&user.roles))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, &user.username))?;

        user_from_row(&row)
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        rows.iter().map(user_from_row).collect()
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 ORDER BY id ASC LIMIT 1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn update(&self, user: &User) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users
            SET username = $2, password_hash = $3, first_name = $4, last_name = $5,
                email = $6, roles = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(roles_to_column(&user.roles))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| write_error(e, &user.username))?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> StoreResult<bool> {
        let healthy = common::health_check(&self.pool).await?;
        if !healthy {
            warn!("User store reports unhealthy database");
        }
        Ok(healthy)
    }
}

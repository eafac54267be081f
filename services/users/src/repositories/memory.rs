//! In-memory user store for development and tests

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{StoreError, StoreResult, UserStore};
use crate::models::{NewUserRecord, User};

#[derive(Debug)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, User>,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

impl Table {
    fn username_taken(&self, username: &str, except: Option<i64>) -> bool {
        self.rows
            .values()
            .any(|u| u.username == username && Some(u.id) != except)
    }
}

/// User store kept in process memory
///
/// Ids are assigned from a counter starting at 1 and never reused, the same
/// way a `BIGSERIAL` column behaves.
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserStore {
    table: Arc<RwLock<Table>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: NewUserRecord) -> StoreResult<User> {
        let mut table = self.table.write().await;

        if table.username_taken(&user.username, None) {
            return Err(StoreError::UsernameTaken(user.username));
        }

        let id = table.next_id;
        table.next_id += 1;

        let stored = User {
            id,
            username: user.username,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            roles: user.roles,
        };
        table.rows.insert(id, stored.clone());

        Ok(stored)
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let table = self.table.read().await;
        Ok(table.rows.values().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let table = self.table.read().await;
        Ok(table.rows.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let table = self.table.read().await;
        Ok(table.rows.values().find(|u| u.username == username).cloned())
    }

    async fn update(&self, user: &User) -> StoreResult<Option<User>> {
        let mut table = self.table.write().await;

        if !table.rows.contains_key(&user.id) {
            return Ok(None);
        }

        if table.username_taken(&user.username, Some(user.id)) {
            return Err(StoreError::UsernameTaken(user.username.clone()));
        }

        table.rows.insert(user.id, user.clone());
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let mut table = self.table.write().await;
        Ok(table.rows.remove(&id).is_some())
    }

    async fn health_check(&self) -> StoreResult<bool> {
        Ok(true)
    }
}

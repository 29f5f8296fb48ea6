use std::collections::HashMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tokio::sync::RwLock;

use crate::db::DbPool;
use crate::errors::StoreError;
use crate::models::{Credential, NewCredential};
use crate::schema::users;

/// User lookup collaborator: the only place stored credentials live.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns the credential registered under `username`, if any.
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, StoreError>;

    /// Persists a new credential. Fails with `DuplicateUsername` if the name is taken.
    async fn insert(&self, new: NewCredential) -> Result<Credential, StoreError>;

    /// Replaces the stored hash, e.g. after re-hashing with a new cost.
    async fn update_password_hash(&self, username: &str, password_hash: &str) -> Result<(), StoreError>;
}

//
// In-memory store
//

/// Process-local user store. Used when no DATABASE_URL is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, Credential>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, StoreError> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn insert(&self, new: NewCredential) -> Result<Credential, StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&new.username) {
            return Err(StoreError::DuplicateUsername);
        }
        let credential = Credential::from_new(new);
        users.insert(credential.username.clone(), credential.clone());
        Ok(credential)
    }

    async fn update_password_hash(&self, username: &str, password_hash: &str) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let credential = users.get_mut(username).ok_or(StoreError::NotFound)?;
        credential.password_hash = password_hash.to_string();
        Ok(())
    }
}

//
// Postgres store
//

/// User store backed by the `users` table.
#[derive(Clone)]
pub struct PgUserStore {
    pool: DbPool,
}

impl PgUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, StoreError> {
        let mut conn = self.pool.get().await?;

        let found = users::table
            .filter(users::username.eq(username))
            .select(Credential::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(found)
    }

    async fn insert(&self, new: NewCredential) -> Result<Credential, StoreError> {
        let mut conn = self.pool.get().await?;

        let credential = Credential::from_new(new);
        diesel::insert_into(users::table)
            .values(&credential)
            .execute(&mut conn)
            .await?;

        tracing::debug!(user_id = %credential.id, "Stored new credential");
        Ok(credential)
    }

    async fn update_password_hash(&self, username: &str, password_hash: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;

        let updated = diesel::update(users::table.filter(users::username.eq(username)))
            .set(users::password_hash.eq(password_hash))
            .execute(&mut conn)
            .await?;

        if updated == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;

use crate::errors::StoreError;
use crate::models::{Session, SessionId};

/// Session-store collaborator. Expired sessions behave exactly like absent ones.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates a new session bound to `username` under a freshly generated id.
    async fn create(&self, username: &str) -> Result<Session, StoreError>;

    /// Looks up a live session.
    async fn get(&self, id: &SessionId) -> Result<Option<Session>, StoreError>;

    /// Destroys the session. Returns whether a session was removed.
    async fn invalidate(&self, id: &SessionId) -> Result<bool, StoreError>;

    /// Drops every expired session, returning how many were removed.
    async fn purge_expired(&self) -> Result<usize, StoreError>;
}

/// Process-local session store guarded by a tokio `RwLock`.
#[derive(Debug)]
pub struct MemorySessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl MemorySessionStore {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            // out-of-range lifetimes are capped at a year
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::days(365)),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, username: &str) -> Result<Session, StoreError> {
        let mut sessions = self.sessions.write().await;
        let mut session = Session::new(username, self.ttl);
        while sessions.contains_key(&session.id) {
            session.id = SessionId::generate();
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn get(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(id).filter(|session| !session.is_expired()).cloned())
    }

    async fn invalidate(&self, id: &SessionId) -> Result<bool, StoreError> {
        Ok(self.sessions.write().await.remove(id).is_some())
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(now));
        Ok(before - sessions.len())
    }
}

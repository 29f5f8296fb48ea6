//! Login and logout: the only transitions between anonymous and authenticated.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, warn};

use data_model_guard::{Credential, Session, SessionId, SessionStore, StoreError, UserStore};

use super::password::{PasswordEncoder, PasswordError};
use super::policy::Authentication;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown user and wrong password both end up here.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authentication service error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(error: StoreError) -> Self {
        Self::Internal(error.to_string())
    }
}

pub struct Authenticator {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    encoder: Arc<dyn PasswordEncoder>,
    /// Verified against when the username is unknown, so both failure paths cost one bcrypt run.
    dummy_hash: String,
    min_duration: Duration,
}

impl Authenticator {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        encoder: Arc<dyn PasswordEncoder>,
        min_duration: Duration,
    ) -> Result<Self, PasswordError> {
        let dummy_hash = encoder.hash("dummy password for unknown users")?;
        Ok(Self {
            users,
            sessions,
            encoder,
            dummy_hash,
            min_duration,
        })
    }

    /// Verifies the credentials and, on success, opens a brand-new session.
    /// Takes at least `min_duration` whatever the outcome.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let deadline = Instant::now() + self.min_duration;

        let outcome = match self.check_credentials(username, password).await {
            Ok(credential) => {
                self.upgrade_hash_if_needed(&credential, password).await;
                self.sessions.create(&credential.username).await.map_err(AuthError::from)
            }
            Err(e) => Err(e),
        };

        sleep_until(deadline).await;

        match &outcome {
            Ok(_) => info!("Successful login"),
            Err(AuthError::InvalidCredentials) => warn!("Failed login attempt"),
            Err(AuthError::Internal(e)) => error!("Login could not be completed: {}", e),
        }
        outcome
    }

    /// Destroys the session. Later lookups of the same id resolve to anonymous.
    pub async fn logout(&self, id: &SessionId) -> Result<(), AuthError> {
        let removed = self.sessions.invalidate(id).await?;
        debug!(removed, "Session invalidated");
        Ok(())
    }

    /// Maps a session id (if any) to the caller's authentication state.
    pub async fn resolve(&self, id: Option<&SessionId>) -> Result<Authentication, AuthError> {
        let Some(id) = id else {
            return Ok(Authentication::Anonymous);
        };
        Ok(Authentication::from(self.sessions.get(id).await?))
    }

    async fn check_credentials(&self, username: &str, password: &str) -> Result<Credential, AuthError> {
        let Some(credential) = self.users.find_by_username(username).await? else {
            let _ = self.verify(password, &self.dummy_hash).await?;
            return Err(AuthError::InvalidCredentials);
        };

        match self.verify(password, &credential.password_hash).await? {
            Ok(true) => Ok(credential),
            Ok(false) => Err(AuthError::InvalidCredentials),
            Err(e) => {
                error!(user_id = %credential.id, "Stored password hash is unreadable: {}", e);
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Re-hashes with the current cost after a successful login. Failures only cost the upgrade.
    async fn upgrade_hash_if_needed(&self, credential: &Credential, password: &str) {
        if !self.encoder.needs_rehash(&credential.password_hash) {
            return;
        }

        let encoder = Arc::clone(&self.encoder);
        let password = password.to_string();
        let rehashed = match tokio::task::spawn_blocking(move || encoder.hash(&password)).await {
            Ok(Ok(hash)) => hash,
            Ok(Err(e)) => {
                warn!(user_id = %credential.id, "Password re-hash failed: {}", e);
                return;
            }
            Err(e) => {
                warn!(user_id = %credential.id, "Password re-hash task failed: {}", e);
                return;
            }
        };

        match self.users.update_password_hash(&credential.username, &rehashed).await {
            Ok(()) => debug!(user_id = %credential.id, "Upgraded password hash"),
            Err(e) => warn!(user_id = %credential.id, "Storing upgraded password hash failed: {}", e),
        }
    }

    /// bcrypt is CPU-bound; keep it off the async workers.
    async fn verify(&self, password: &str, hash: &str) -> Result<Result<bool, PasswordError>, AuthError> {
        let encoder = Arc::clone(&self.encoder);
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || encoder.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("Password verification task failed: {}", e)))
    }
}

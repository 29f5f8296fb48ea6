use std::sync::Arc;

use tracing::info;

use data_model_guard::{Credential, NewCredential, StoreError, UserStore};

use super::password::{MAX_PASSWORD_BYTES, PasswordEncoder, PasswordError};

/// Longest accepted username (the length limit of an email address).
pub const MAX_USERNAME_LEN: usize = 254;

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("Username must be 1-254 characters without whitespace")]
    InvalidUsername,

    #[error("Password must be 1-72 bytes")]
    InvalidPassword,

    #[error("Username is already registered")]
    DuplicateUsername,

    #[error("Registration failed: {0}")]
    Internal(String),
}

impl From<StoreError> for RegistrationError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::DuplicateUsername => Self::DuplicateUsername,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<PasswordError> for RegistrationError {
    fn from(error: PasswordError) -> Self {
        match error {
            PasswordError::TooLong => Self::InvalidPassword,
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Signup: hashes the password and stores the new credential.
pub struct Registrar {
    users: Arc<dyn UserStore>,
    encoder: Arc<dyn PasswordEncoder>,
}

impl Registrar {
    pub fn new(users: Arc<dyn UserStore>, encoder: Arc<dyn PasswordEncoder>) -> Self {
        Self { users, encoder }
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<Credential, RegistrationError> {
        let username = username.trim();
        validate_username(username)?;
        if password.is_empty() || password.len() > MAX_PASSWORD_BYTES {
            return Err(RegistrationError::InvalidPassword);
        }

        let encoder = Arc::clone(&self.encoder);
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || encoder.hash(&password))
            .await
            .map_err(|e| RegistrationError::Internal(e.to_string()))??;

        let credential = self
            .users
            .insert(NewCredential {
                username: username.to_string(),
                password_hash,
            })
            .await?;

        info!(user_id = %credential.id, "Registered new user");
        Ok(credential)
    }
}

fn validate_username(username: &str) -> Result<(), RegistrationError> {
    let valid = !username.is_empty()
        && username.chars().count() <= MAX_USERNAME_LEN
        && !username.chars().any(|c| c.is_whitespace() || c.is_control());
    if valid { Ok(()) } else { Err(RegistrationError::InvalidUsername) }
}

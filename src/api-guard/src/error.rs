use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use core_guard::{AuthError, RegistrationError};

/// Failures that reach the client as a JSON error body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Auth(AuthError::InvalidCredentials) => (StatusCode::UNAUTHORIZED, "Invalid credentials"),
            ApiError::Registration(RegistrationError::DuplicateUsername) => {
                (StatusCode::CONFLICT, "Username is already registered")
            }
            ApiError::Registration(RegistrationError::InvalidUsername | RegistrationError::InvalidPassword) => {
                (StatusCode::BAD_REQUEST, "Invalid username or password")
            }
            ApiError::Auth(AuthError::Internal(_)) | ApiError::Registration(RegistrationError::Internal(_)) => {
                error!("{}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error")
            }
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// Failures raised by the user and session stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Username is already registered")]
    DuplicateUsername,

    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    DbError(DieselError),

    #[error("Database pool error: {0}")]
    DbPoolError(String),
}

impl From<DieselError> for StoreError {
    fn from(error: DieselError) -> Self {
        match error {
            DieselError::NotFound => Self::NotFound,
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => Self::DuplicateUsername,
            _ => Self::DbError(error),
        }
    }
}

impl<E: std::fmt::Debug> From<deadpool::managed::PoolError<E>> for StoreError {
    fn from(error: deadpool::managed::PoolError<E>) -> Self {
        Self::DbPoolError(format!("{:?}", error))
    }
}

use std::env::VarError;

use data_model_guard::db::{ConnectionPoolError, DbPool, establish_connection_pool};

/// Connects to the database named by DATABASE_URL.
/// Returns `Ok(None)` when DATABASE_URL is unset, meaning the caller should fall back to in-memory users.
pub async fn get_db_pool() -> Result<Option<DbPool>, ConnectionPoolError> {
    match get_database_url() {
        Ok(database_url) => establish_connection_pool(&database_url).await.map(Some),
        Err(_) => Ok(None),
    }
}

/// Retrieves the value for the env var DATABASE_URL.
pub fn get_database_url() -> Result<String, VarError> {
    std::env::var("DATABASE_URL")
}

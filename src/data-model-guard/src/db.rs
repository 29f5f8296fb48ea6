use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::deadpool::Pool;

pub type PoolError = deadpool::managed::PoolError<diesel_async::pooled_connection::PoolError>;

pub type DbPool = Pool<AsyncPgConnection>;

#[derive(Debug, thiserror::Error)]
pub enum ConnectionPoolError {
    #[error("Failed to build connection pool: {0}")]
    BuildError(#[from] deadpool::managed::BuildError),
    #[error("Failed to establish initial database connection: {0}")]
    ConnectionError(#[from] PoolError),
}

/// Builds the Postgres pool backing the user store.
/// Checks out one connection up front so a bad DATABASE_URL fails at startup, not on the first login.
pub async fn establish_connection_pool(database_url: &str) -> Result<DbPool, ConnectionPoolError> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    let pool = Pool::builder(manager).build()?;

    let _conn = pool.get().await?;

    Ok(pool)
}

use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
use eyre::{Error, Result};

/// Async Postgres connection pool
pub type DbPool = Pool<AsyncPgConnection>;

/// Builds the database connection pool.
///
/// Connections are opened lazily, so this succeeds even if the database is
/// down; the first `get()` reports the failure.
///
/// # Arguments
/// * `database_url` - Postgres URL
/// * `max_size` - Maximum pooled connections
///
/// # Errors
/// * If pool creation fails
pub fn create_pool(database_url: &str, max_size: usize) -> Result<DbPool> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    Pool::builder(manager)
        .max_size(max_size)
        .build()
        .map_err(|e| Error::msg(format!("Failed to create connection pool: {e}")))
}

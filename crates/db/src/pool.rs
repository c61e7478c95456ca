//! Connection pool management
//!
//! Every connection runs with `foreign_keys = ON` so review rows follow
//! their book on delete.

use std::str::FromStr;
use std::time::Duration;

use shelf_kernel::settings::DatabaseSettings;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};

use crate::DbError;

/// Create a pool from the `[database]` settings section.
pub async fn create_pool(settings: &DatabaseSettings) -> Result<SqlitePool, DbError> {
    create_pool_with_options(&settings.url, settings.max_connections).await
}

/// Create a SQLite connection pool with custom options.
///
/// File databases are created if missing and use WAL. An in-memory URL is
/// pinned to a single never-recycled connection, since each SQLite
/// connection would otherwise see its own empty database.
pub async fn create_pool_with_options(
    database_url: &str,
    max_connections: u32,
) -> Result<SqlitePool, DbError> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|source| DbError::InvalidUrl {
            url: database_url.to_owned(),
            source,
        })?
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    if is_memory_url(database_url) {
        return connect_single(options).await;
    }

    let options = options
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    tracing::debug!(url = %database_url, max_connections, "sqlite pool created");
    Ok(pool)
}

/// Fresh private in-memory database, used by tests and `sqlite::memory:`.
pub async fn connect_in_memory() -> Result<SqlitePool, DbError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    connect_single(options).await
}

async fn connect_single(options: SqliteConnectOptions) -> Result<SqlitePool, DbError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    Ok(pool)
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

//! SQLite persistence plumbing: pool creation, migration runner, and the
//! core `db` module that owns the pool's lifecycle.

use async_trait::async_trait;
use shelf_kernel::{InitCtx, Module};
use sqlx::SqlitePool;

pub mod migrations;
pub mod pool;

pub use migrations::run_migrations;
pub use pool::{connect_in_memory, create_pool, create_pool_with_options};

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("invalid database url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("migration {module}/{id} failed: {source}")]
    Migration {
        module: String,
        id: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

/// Core module that closes the pool on shutdown.
pub struct DbModule {
    pool: SqlitePool,
}

impl DbModule {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Module for DbModule {
    fn name(&self) -> &'static str {
        "db"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        tracing::info!(
            module = self.name(),
            url = %ctx.settings.database.url,
            max_connections = ctx.settings.database.max_connections,
            "database reachable"
        );
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.pool.close().await;
        tracing::info!(module = self.name(), "database pool closed");
        Ok(())
    }
}

/// Create a new instance of the db module
pub fn create_module(pool: SqlitePool) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(DbModule::new(pool))
}

//! Applies module migrations in order, once each.
//!
//! Applied migrations are recorded in `schema_migrations` keyed by
//! `(module, id)`. Each migration runs in its own transaction together
//! with its bookkeeping row.

use shelf_kernel::Migration;
use sqlx::SqlitePool;

use crate::DbError;

const BOOKKEEPING_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS schema_migrations (
        module     TEXT NOT NULL,
        id         TEXT NOT NULL,
        applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (module, id)
    )
"#;

/// Apply every pending migration, returning how many ran.
///
/// `migrations` is expected in execution order, as produced by
/// `ModuleRegistry::collect_migrations`.
pub async fn run_migrations(
    pool: &SqlitePool,
    migrations: &[(String, Migration)],
) -> Result<usize, DbError> {
    sqlx::query(BOOKKEEPING_TABLE).execute(pool).await?;

    let mut applied = 0;
    for (module, migration) in migrations {
        let already: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM schema_migrations WHERE module = ? AND id = ?",
        )
        .bind(module)
        .bind(migration.id)
        .fetch_one(pool)
        .await?;

        if already > 0 {
            tracing::debug!(module = %module, id = migration.id, "migration already applied");
            continue;
        }

        let wrap = |source| DbError::Migration {
            module: module.clone(),
            id: migration.id,
            source,
        };

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .map_err(wrap)?;
        sqlx::query("INSERT INTO schema_migrations (module, id) VALUES (?, ?)")
            .bind(module)
            .bind(migration.id)
            .execute(&mut *tx)
            .await
            .map_err(wrap)?;
        tx.commit().await.map_err(wrap)?;

        tracing::info!(module = %module, id = migration.id, "migration applied");
        applied += 1;
    }

    Ok(applied)
}

//! Application lifecycle: registry assembly, migrations, serve, shutdown.

use anyhow::Context;
use shelf_kernel::{InitCtx, ModuleRegistry, Settings};
use sqlx::SqlitePool;

use crate::modules;

/// Registry with the core `db` module and every project module.
pub fn build_registry(pool: SqlitePool) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry.register_core(shelf_db::create_module(pool));
    modules::register_all(&mut registry);

    tracing::info!(
        core = registry.core_module_count(),
        custom = registry.custom_module_count(),
        "module registry assembled"
    );
    registry
}

/// Initialize every module and apply pending migrations.
///
/// Returns how many migrations ran.
pub async fn prepare(registry: &ModuleRegistry, ctx: &InitCtx<'_>) -> anyhow::Result<usize> {
    registry.init_core_modules(ctx).await?;
    registry.init_custom_modules(ctx).await?;
    apply_migrations(registry, ctx.db).await
}

/// Run the full lifecycle until a shutdown signal arrives.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(env = ?settings.environment, "shelf starting");

    let pool = shelf_db::create_pool(&settings.database)
        .await
        .context("failed to open database")?;
    let registry = build_registry(pool.clone());
    let ctx = InitCtx {
        settings: &settings,
        db: &pool,
    };

    prepare(&registry, &ctx).await?;

    registry.start_core_modules(&ctx).await?;
    registry.start_custom_modules(&ctx).await?;

    let served = shelf_http::start_server(&registry, &ctx).await;

    // Shut down even when serving failed, then report the first error
    let stopped_custom = registry.stop_custom_modules().await;
    let stopped_core = registry.stop_core_modules().await;

    served?;
    stopped_custom?;
    stopped_core?;

    tracing::info!("shelf stopped");
    Ok(())
}

/// Apply pending migrations and exit without serving.
pub async fn migrate(settings: Settings) -> anyhow::Result<usize> {
    let pool = shelf_db::create_pool(&settings.database)
        .await
        .context("failed to open database")?;
    let registry = build_registry(pool.clone());

    let applied = apply_migrations(&registry, &pool).await;
    pool.close().await;
    applied
}

async fn apply_migrations(registry: &ModuleRegistry, pool: &SqlitePool) -> anyhow::Result<usize> {
    let migrations = registry.collect_migrations();
    let applied = shelf_db::run_migrations(pool, &migrations)
        .await
        .context("failed to apply migrations")?;

    tracing::info!(
        applied,
        known = migrations.len(),
        "migrations up to date"
    );
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registry_holds_db_and_books() {
        let pool = shelf_db::connect_in_memory().await.unwrap();
        let registry = build_registry(pool);

        assert_eq!(registry.core_module_count(), 1);
        assert!(registry.get_module("db").is_some());
        assert!(registry.get_module("books").is_some());
    }

    #[tokio::test]
    async fn prepare_is_repeatable() {
        let settings = Settings::default();
        let pool = shelf_db::connect_in_memory().await.unwrap();
        let registry = build_registry(pool.clone());
        let ctx = InitCtx {
            settings: &settings,
            db: &pool,
        };

        assert_eq!(prepare(&registry, &ctx).await.unwrap(), 1);
        assert_eq!(prepare(&registry, &ctx).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn migrate_creates_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.database.url = format!("sqlite://{}", dir.path().join("shelf.db").display());

        assert_eq!(migrate(settings.clone()).await.unwrap(), 1);
        assert_eq!(migrate(settings).await.unwrap(), 0);
    }
}

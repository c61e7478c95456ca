use async_trait::async_trait;
use axum::Router;
use sqlx::SqlitePool;

/// Shared handles passed to every lifecycle hook and to `routes`.
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
    pub db: &'a SqlitePool,
}

/// One schema step. Applied at most once per `(module, id)` pair.
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    /// SQL script; may hold several statements
    pub up: &'static str,
}

/// A unit of the application that contributes pages, schema, and
/// lifecycle hooks. Every hook has a no-op default.
#[async_trait]
pub trait Module: Sync + Send {
    /// Also the mount point: routes are served under `/{name}`
    fn name(&self) -> &'static str;

    /// Runs before migrations, so the schema may not exist yet
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn routes(&self, _ctx: &InitCtx<'_>) -> Router {
        Router::new()
    }

    /// OpenAPI fragment with `paths` relative to the mount point and
    /// optional `components.schemas`
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Ordered by id when applied
    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }

    /// Runs after migrations, before the server accepts requests
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs after the server has drained
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

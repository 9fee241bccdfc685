//! Connection pool setup and health checking.

use ivd_domain::{IvdError, IvdResult};
use sqlx::postgres::{PgPoolOptions, PgPool};
use tracing::info;

#[derive(Debug, Clone)]
pub struct PgClient {
    pool: PgPool,
}

impl PgClient {
    pub async fn connect(database_url: &str, max_connections: u32) -> IvdResult<Self> {
        info!(max_connections, "connecting to database");
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| IvdError::Upstream(format!("failed to connect to database: {e}")))?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> IvdResult<bool> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| true)
            .map_err(|e| IvdError::Upstream(format!("database health check failed: {e}")))
    }

    pub async fn run_migrations(&self) -> IvdResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| IvdError::Upstream(format!("migration failed: {e}")))
    }
}

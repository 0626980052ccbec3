//! Database liveness probe used by the health endpoint.

use anyhow::{Context, Result};
use sqlx::PgPool;

/// Verify the database connection is alive.
pub async fn ping(pool: &PgPool) -> Result<()> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await
        .context("database ping failed")?;
    Ok(())
}

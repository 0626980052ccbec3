//! Database operations for the `weeks` table (cached HVW season weeks).

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::data::models::{NewWeek, UpsertCounts, Week};

/// Batch upsert weeks by their natural key (`external_date`).
///
/// One statement for the whole batch; `RETURNING (xmax = 0)` yields a flag
/// per inserted or changed row, which is where the per-record counts come
/// from. Unchanged conflicting rows return nothing and count as matched.
pub async fn batch_upsert(pool: &PgPool, weeks: &[NewWeek]) -> Result<UpsertCounts> {
    if weeks.is_empty() {
        return Ok(UpsertCounts::default());
    }

    let dates: Vec<&str> = weeks.iter().map(|w| w.external_date.as_str()).collect();
    let current: Vec<bool> = weeks.iter().map(|w| w.is_current).collect();

    let flags: Vec<bool> = sqlx::query_scalar(
        r#"
        INSERT INTO weeks (external_date, is_current)
        SELECT * FROM UNNEST($1::text[], $2::boolean[])
        ON CONFLICT (external_date)
        DO UPDATE SET is_current = EXCLUDED.is_current
        WHERE weeks.is_current IS DISTINCT FROM EXCLUDED.is_current
        RETURNING (xmax = 0)
        "#,
    )
    .bind(&dates)
    .bind(&current)
    .fetch_all(pool)
    .await
    .context("failed to batch upsert weeks")?;

    Ok(UpsertCounts::from_returned_flags(weeks.len(), &flags))
}

/// All cached weeks in chronological (external date) order.
pub async fn list(pool: &PgPool) -> Result<Vec<Week>> {
    sqlx::query_as::<_, Week>(
        "SELECT id, external_date, is_current FROM weeks ORDER BY external_date",
    )
    .fetch_all(pool)
    .await
    .context("failed to list weeks")
}

/// Administrative reset. Returns the number of removed rows.
pub async fn delete_all(pool: &PgPool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM weeks")
        .execute(pool)
        .await
        .context("failed to delete weeks")?;
    Ok(result.rows_affected())
}

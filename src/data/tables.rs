//! Database operations for the `league_tables` table (standings per class).

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::data::models::{NewLeagueTable, UpsertCounts};

/// Batch upsert standings tables by their natural key (`class_id` -- one
/// table per class). Scores are stored as one ordered JSONB list.
pub async fn batch_upsert(pool: &PgPool, tables: &[NewLeagueTable]) -> Result<UpsertCounts> {
    if tables.is_empty() {
        return Ok(UpsertCounts::default());
    }

    let class_ids: Vec<i32> = tables.iter().map(|t| t.class_id).collect();
    let scores: Vec<serde_json::Value> = tables
        .iter()
        .map(|t| serde_json::to_value(&t.scores))
        .collect::<Result<_, _>>()
        .context("failed to serialize table scores")?;

    let flags: Vec<bool> = sqlx::query_scalar(
        r#"
        INSERT INTO league_tables (class_id, scores)
        SELECT * FROM UNNEST($1::int[], $2::jsonb[])
        ON CONFLICT (class_id)
        DO UPDATE SET scores = EXCLUDED.scores
        WHERE league_tables.scores IS DISTINCT FROM EXCLUDED.scores
        RETURNING (xmax = 0)
        "#,
    )
    .bind(&class_ids)
    .bind(&scores)
    .fetch_all(pool)
    .await
    .context("failed to batch upsert league tables")?;

    Ok(UpsertCounts::from_returned_flags(tables.len(), &flags))
}

/// Administrative reset. Returns the number of removed rows.
pub async fn delete_all(pool: &PgPool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM league_tables")
        .execute(pool)
        .await
        .context("failed to delete league tables")?;
    Ok(result.rows_affected())
}

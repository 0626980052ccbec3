//! Database operations for the `classes` table (cached HVW league classes).

use std::collections::HashMap;

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::data::models::{Class, NewClass, UpsertCounts};

/// Batch upsert classes by their natural key (`external_id`).
pub async fn batch_upsert(pool: &PgPool, classes: &[NewClass]) -> Result<UpsertCounts> {
    if classes.is_empty() {
        return Ok(UpsertCounts::default());
    }

    let external_ids: Vec<i64> = classes.iter().map(|c| c.external_id).collect();
    let short_names: Vec<&str> = classes.iter().map(|c| c.short_name.as_str()).collect();
    let long_names: Vec<&str> = classes.iter().map(|c| c.long_name.as_str()).collect();

    let flags: Vec<bool> = sqlx::query_scalar(
        r#"
        INSERT INTO classes (external_id, short_name, long_name)
        SELECT * FROM UNNEST($1::bigint[], $2::text[], $3::text[])
        ON CONFLICT (external_id)
        DO UPDATE SET short_name = EXCLUDED.short_name, long_name = EXCLUDED.long_name
        WHERE (classes.short_name, classes.long_name)
            IS DISTINCT FROM (EXCLUDED.short_name, EXCLUDED.long_name)
        RETURNING (xmax = 0)
        "#,
    )
    .bind(&external_ids)
    .bind(&short_names)
    .bind(&long_names)
    .fetch_all(pool)
    .await
    .context("failed to batch upsert classes")?;

    Ok(UpsertCounts::from_returned_flags(classes.len(), &flags))
}

/// All cached classes, short name order.
pub async fn list(pool: &PgPool) -> Result<Vec<Class>> {
    sqlx::query_as::<_, Class>(
        "SELECT id, external_id, short_name, long_name FROM classes ORDER BY short_name",
    )
    .fetch_all(pool)
    .await
    .context("failed to list classes")
}

/// Resolution map from externally assigned class id to local id.
///
/// Loaded once per orchestration run so cross-reference resolution is a pure
/// in-memory lookup.
pub async fn id_map(pool: &PgPool) -> Result<HashMap<i64, i32>> {
    let rows: Vec<(i64, i32)> = sqlx::query_as("SELECT external_id, id FROM classes")
        .fetch_all(pool)
        .await
        .context("failed to load class id map")?;
    Ok(rows.into_iter().collect())
}

/// Administrative reset. Cascades into games and league tables.
pub async fn delete_all(pool: &PgPool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM classes")
        .execute(pool)
        .await
        .context("failed to delete classes")?;
    Ok(result.rows_affected())
}

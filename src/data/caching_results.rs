//! Append-only ledger of orchestration runs (`caching_results` table).
//!
//! Rows are never mutated or individually deleted; `append` fails only when
//! storage itself is unavailable.

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::data::models::{CacheStatus, CachingResult, CachingType, UpsertCounts};

/// A result ready to be appended to the ledger.
#[derive(Debug, Clone)]
pub struct NewCachingResult {
    pub caching_type: CachingType,
    pub status: CacheStatus,
    pub duration_seconds: f64,
    pub counts: UpsertCounts,
    pub initiated_by: Option<String>,
}

pub async fn append(pool: &PgPool, result: &NewCachingResult) -> Result<CachingResult> {
    sqlx::query_as::<_, CachingResult>(
        r#"
        INSERT INTO caching_results (
            caching_type, status, duration_seconds,
            inserted, upserted, matched, modified, removed, initiated_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id, caching_type, status, duration_seconds,
                  inserted, upserted, matched, modified, removed,
                  initiated_by, created_at
        "#,
    )
    .bind(result.caching_type.as_str())
    .bind(result.status.as_str())
    .bind(result.duration_seconds)
    .bind(result.counts.inserted)
    .bind(result.counts.upserted)
    .bind(result.counts.matched)
    .bind(result.counts.modified)
    .bind(result.counts.removed)
    .bind(result.initiated_by.as_deref())
    .fetch_one(pool)
    .await
    .context("failed to append caching result")
}

/// All results for one caching type, newest first.
pub async fn list_for_type(pool: &PgPool, caching_type: CachingType) -> Result<Vec<CachingResult>> {
    sqlx::query_as::<_, CachingResult>(
        r#"
        SELECT id, caching_type, status, duration_seconds,
               inserted, upserted, matched, modified, removed,
               initiated_by, created_at
        FROM caching_results
        WHERE caching_type = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(caching_type.as_str())
    .fetch_all(pool)
    .await
    .context("failed to list caching results")
}

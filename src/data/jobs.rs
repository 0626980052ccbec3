//! Database operations for the `jobs` table (persisted caching job
//! definitions). The scheduler is the only writer; it maps unique-violation
//! errors to its own taxonomy, so these functions surface `sqlx::Error`
//! directly instead of wrapping it.

use sqlx::PgPool;

use crate::data::models::{CachingType, Job};

const JOB_SELECT: &str = "SELECT id, name, caching_type, schedule_expression, disabled, \
     created_at, updated_at FROM jobs";

/// A partial job mutation. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct JobChanges {
    pub name: Option<String>,
    pub caching_type: Option<CachingType>,
    pub schedule_expression: Option<String>,
    pub disabled: Option<bool>,
}

/// All persisted jobs, oldest first -- the startup replay order.
pub async fn list(pool: &PgPool) -> Result<Vec<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>(&format!("{JOB_SELECT} ORDER BY id"))
        .fetch_all(pool)
        .await
}

pub async fn insert(
    pool: &PgPool,
    name: &str,
    caching_type: CachingType,
    schedule_expression: &str,
    disabled: bool,
) -> Result<Job, sqlx::Error> {
    sqlx::query_as::<_, Job>(
        r#"
        INSERT INTO jobs (name, caching_type, schedule_expression, disabled)
        VALUES ($1, $2, $3, $4)
        RETURNING id, name, caching_type, schedule_expression, disabled, created_at, updated_at
        "#,
    )
    .bind(name)
    .bind(caching_type.as_str())
    .bind(schedule_expression)
    .bind(disabled)
    .fetch_one(pool)
    .await
}

/// Apply a partial update; returns the updated job, or `None` for an unknown id.
pub async fn update(
    pool: &PgPool,
    id: i32,
    changes: &JobChanges,
) -> Result<Option<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>(
        r#"
        UPDATE jobs SET
            name = COALESCE($2, name),
            caching_type = COALESCE($3, caching_type),
            schedule_expression = COALESCE($4, schedule_expression),
            disabled = COALESCE($5, disabled),
            updated_at = now()
        WHERE id = $1
        RETURNING id, name, caching_type, schedule_expression, disabled, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(changes.name.as_deref())
    .bind(changes.caching_type.map(CachingType::as_str))
    .bind(changes.schedule_expression.as_deref())
    .bind(changes.disabled)
    .fetch_optional(pool)
    .await
}

/// Delete a job row. Returns whether a row existed.
pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

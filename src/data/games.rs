//! Database operations for the `games` table (cached HVW games).

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::data::models::{NewGame, UpsertCounts};

/// Batch upsert games by their natural key (`external_id`).
///
/// Callers must hand in at most one record per external id; the single-batch
/// statement cannot update the same row twice.
pub async fn batch_upsert(pool: &PgPool, games: &[NewGame]) -> Result<UpsertCounts> {
    if games.is_empty() {
        return Ok(UpsertCounts::default());
    }

    let external_ids: Vec<i64> = games.iter().map(|g| g.external_id).collect();
    let class_ids: Vec<i32> = games.iter().map(|g| g.class_id).collect();
    let weeks: Vec<&str> = games.iter().map(|g| g.week.as_str()).collect();
    let dates: Vec<&str> = games.iter().map(|g| g.date.as_str()).collect();
    let times: Vec<&str> = games.iter().map(|g| g.time.as_str()).collect();
    let home_teams: Vec<&str> = games.iter().map(|g| g.home_team.as_str()).collect();
    let guest_teams: Vec<&str> = games.iter().map(|g| g.guest_team.as_str()).collect();
    let home_goals: Vec<Option<i32>> = games.iter().map(|g| g.home_goals).collect();
    let guest_goals: Vec<Option<i32>> = games.iter().map(|g| g.guest_goals).collect();
    let gym_towns: Vec<&str> = games.iter().map(|g| g.gymnasium_town.as_str()).collect();
    let gym_names: Vec<&str> = games.iter().map(|g| g.gymnasium_name.as_str()).collect();
    let gym_nos: Vec<&str> = games.iter().map(|g| g.gymnasium_no.as_str()).collect();

    let flags: Vec<bool> = sqlx::query_scalar(
        r#"
        INSERT INTO games (
            external_id, class_id, week, date, time,
            home_team, guest_team, home_goals, guest_goals,
            gymnasium_town, gymnasium_name, gymnasium_no
        )
        SELECT * FROM UNNEST(
            $1::bigint[], $2::int[], $3::text[], $4::text[], $5::text[],
            $6::text[], $7::text[], $8::int[], $9::int[],
            $10::text[], $11::text[], $12::text[]
        )
        ON CONFLICT (external_id)
        DO UPDATE SET
            class_id = EXCLUDED.class_id,
            week = EXCLUDED.week,
            date = EXCLUDED.date,
            time = EXCLUDED.time,
            home_team = EXCLUDED.home_team,
            guest_team = EXCLUDED.guest_team,
            home_goals = EXCLUDED.home_goals,
            guest_goals = EXCLUDED.guest_goals,
            gymnasium_town = EXCLUDED.gymnasium_town,
            gymnasium_name = EXCLUDED.gymnasium_name,
            gymnasium_no = EXCLUDED.gymnasium_no
        WHERE (
            games.class_id, games.week, games.date, games.time,
            games.home_team, games.guest_team, games.home_goals, games.guest_goals,
            games.gymnasium_town, games.gymnasium_name, games.gymnasium_no
        ) IS DISTINCT FROM (
            EXCLUDED.class_id, EXCLUDED.week, EXCLUDED.date, EXCLUDED.time,
            EXCLUDED.home_team, EXCLUDED.guest_team, EXCLUDED.home_goals, EXCLUDED.guest_goals,
            EXCLUDED.gymnasium_town, EXCLUDED.gymnasium_name, EXCLUDED.gymnasium_no
        )
        RETURNING (xmax = 0)
        "#,
    )
    .bind(&external_ids)
    .bind(&class_ids)
    .bind(&weeks)
    .bind(&dates)
    .bind(&times)
    .bind(&home_teams)
    .bind(&guest_teams)
    .bind(&home_goals)
    .bind(&guest_goals)
    .bind(&gym_towns)
    .bind(&gym_names)
    .bind(&gym_nos)
    .fetch_all(pool)
    .await
    .context("failed to batch upsert games")?;

    Ok(UpsertCounts::from_returned_flags(games.len(), &flags))
}

/// Administrative reset. Returns the number of removed rows.
pub async fn delete_all(pool: &PgPool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM games")
        .execute(pool)
        .await
        .context("failed to delete games")?;
    Ok(result.rows_affected())
}

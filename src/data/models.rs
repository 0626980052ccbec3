//! Shared domain types for cached HVW entities, jobs, and run results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four synchronized entity categories.
///
/// Stored as uppercase text in the database and on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CachingType {
    Weeks,
    Classes,
    Games,
    Tables,
}

impl CachingType {
    pub const ALL: [CachingType; 4] = [
        CachingType::Weeks,
        CachingType::Classes,
        CachingType::Games,
        CachingType::Tables,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CachingType::Weeks => "WEEKS",
            CachingType::Classes => "CLASSES",
            CachingType::Games => "GAMES",
            CachingType::Tables => "TABLES",
        }
    }

    /// Parse the uppercase storage/wire form. Case-insensitive so the
    /// `/api/cache/{type}` path segment can be lowercase.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "WEEKS" => Some(CachingType::Weeks),
            "CLASSES" => Some(CachingType::Classes),
            "GAMES" => Some(CachingType::Games),
            "TABLES" => Some(CachingType::Tables),
            _ => None,
        }
    }
}

impl std::fmt::Display for CachingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome status of one orchestration run.
///
/// Runs that abort never reach the ledger today, so `Failed` is only ever
/// read back if a stricter mode starts writing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Ok,
    Failed,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Ok => "ok",
            CacheStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ok" => Some(CacheStatus::Ok),
            "failed" => Some(CacheStatus::Failed),
            _ => None,
        }
    }
}

/// A persisted cron-style job definition driving one caching type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: i32,
    pub name: String,
    pub caching_type: CachingType,
    pub schedule_expression: String,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-record outcome counts from one bulk upsert, plus removals.
///
/// Derived from the batch `RETURNING (xmax = 0)` statement: `upserted`
/// counts rows newly created by the upsert, `matched` counts rows whose
/// natural key already existed, `modified` the subset of matched rows whose
/// fields actually changed. `inserted` stays zero on the upsert path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertCounts {
    pub inserted: i64,
    pub upserted: i64,
    pub matched: i64,
    pub modified: i64,
    pub removed: i64,
}

impl UpsertCounts {
    /// Build counts from one `RETURNING (xmax = 0)` batch statement: the
    /// statement returns a row per inserted or updated record, `true` for
    /// fresh inserts. Conflicting-but-unchanged records return nothing and
    /// only count as matched.
    pub fn from_returned_flags(batch_size: usize, inserted_flags: &[bool]) -> Self {
        let upserted = inserted_flags.iter().filter(|&&new| new).count() as i64;
        let modified = inserted_flags.len() as i64 - upserted;
        Self {
            inserted: 0,
            upserted,
            matched: batch_size as i64 - upserted,
            modified,
            removed: 0,
        }
    }
}

/// One immutable audit record of an orchestration run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachingResult {
    pub id: i32,
    pub caching_type: CachingType,
    pub status: CacheStatus,
    pub duration_seconds: f64,
    pub inserted: i64,
    pub upserted: i64,
    pub matched: i64,
    pub modified: i64,
    pub removed: i64,
    pub initiated_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for Job {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Job {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            caching_type: parse_column(row.try_get("caching_type")?, "caching_type", CachingType::parse)?,
            schedule_expression: row.try_get("schedule_expression")?,
            disabled: row.try_get("disabled")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for CachingResult {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(CachingResult {
            id: row.try_get("id")?,
            caching_type: parse_column(row.try_get("caching_type")?, "caching_type", CachingType::parse)?,
            status: parse_column(row.try_get("status")?, "status", CacheStatus::parse)?,
            duration_seconds: row.try_get("duration_seconds")?,
            inserted: row.try_get("inserted")?,
            upserted: row.try_get("upserted")?,
            matched: row.try_get("matched")?,
            modified: row.try_get("modified")?,
            removed: row.try_get("removed")?,
            initiated_by: row.try_get("initiated_by")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Decode a text column into its enum form, surfacing unknown values as a
/// column decode error instead of a panic.
fn parse_column<T>(
    raw: String,
    column: &str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Result<T, sqlx::Error> {
    parse(&raw).ok_or_else(|| sqlx::Error::ColumnDecode {
        index: column.to_owned(),
        source: format!("unrecognized value: {raw}").into(),
    })
}

/// A season week as published by the HVW endpoint.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Week {
    pub id: i32,
    pub external_date: String,
    pub is_current: bool,
}

/// A transformed week ready for upsert (natural key: `external_date`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWeek {
    pub external_date: String,
    pub is_current: bool,
}

/// A league class (division) with its externally assigned id.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: i32,
    pub external_id: i64,
    pub short_name: String,
    pub long_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClass {
    pub external_id: i64,
    pub short_name: String,
    pub long_name: String,
}

/// A transformed game ready for upsert (natural key: `external_id`).
///
/// `class_id` is the local id resolved from the external class reference;
/// records that fail resolution never reach the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGame {
    pub external_id: i64,
    pub class_id: i32,
    pub week: String,
    pub date: String,
    pub time: String,
    pub home_team: String,
    pub guest_team: String,
    pub home_goals: Option<i32>,
    pub guest_goals: Option<i32>,
    pub gymnasium_town: String,
    pub gymnasium_name: String,
    pub gymnasium_no: String,
}

/// One row of a standings table, stored as an ordered JSONB list per class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableScore {
    pub position: i32,
    pub team_name: String,
    pub games_won: i32,
    pub games_equal: i32,
    pub games_lost: i32,
    pub games_played: i32,
    pub goals_shot: i32,
    pub goals_received: i32,
    pub points: i32,
}

/// A transformed standings table ready for upsert (natural key: `class_id`).
#[derive(Debug, Clone)]
pub struct NewLeagueTable {
    pub class_id: i32,
    pub scores: Vec<TableScore>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caching_type_round_trips_through_storage_form() {
        for ct in CachingType::ALL {
            assert_eq!(CachingType::parse(ct.as_str()), Some(ct));
        }
        assert_eq!(CachingType::parse("games"), Some(CachingType::Games));
        assert_eq!(CachingType::parse("fixtures"), None);
    }

    #[test]
    fn caching_type_serializes_uppercase() {
        let json = serde_json::to_string(&CachingType::Weeks).unwrap();
        assert_eq!(json, "\"WEEKS\"");
        let back: CachingType = serde_json::from_str("\"TABLES\"").unwrap();
        assert_eq!(back, CachingType::Tables);
    }

    #[test]
    fn counts_from_all_new_rows() {
        let counts = UpsertCounts::from_returned_flags(3, &[true, true, true]);
        assert_eq!(counts.upserted, 3);
        assert_eq!(counts.matched, 0);
        assert_eq!(counts.modified, 0);
        assert_eq!(counts.inserted, 0);
    }

    #[test]
    fn counts_from_identical_rerun_only_match() {
        // Second identical batch: every row conflicts unchanged, nothing returned.
        let counts = UpsertCounts::from_returned_flags(3, &[]);
        assert_eq!(counts.upserted, 0);
        assert_eq!(counts.matched, 3);
        assert_eq!(counts.modified, 0);
    }

    #[test]
    fn counts_from_mixed_batch() {
        // 5 records: 2 new, 1 changed, 2 untouched.
        let counts = UpsertCounts::from_returned_flags(5, &[true, false, true]);
        assert_eq!(counts.upserted, 2);
        assert_eq!(counts.matched, 3);
        assert_eq!(counts.modified, 1);
    }
}

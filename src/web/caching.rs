//! Handlers for on-demand cache runs, the result ledger, and the
//! administrative reset of cached entity records.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info, instrument};

use crate::cache::RunOutcome;
use crate::data::models::{CachingResult, CachingType};
use crate::data::{caching_results, classes, games, tables, weeks};
use crate::state::AppState;
use crate::web::error::ApiError;

fn parse_type(raw: &str) -> Result<CachingType, ApiError> {
    CachingType::parse(raw)
        .ok_or_else(|| ApiError::bad_request(format!("Unknown caching type: {raw}")))
}

#[derive(Debug, Deserialize)]
pub struct RunParams {
    /// Opaque initiating-user reference recorded on the result. Absent for
    /// cron-triggered runs.
    pub user: Option<String>,
}

/// `POST /api/cache/{type}` -- run one caching cycle now.
#[instrument(skip_all, fields(caching_type = %raw_type))]
pub async fn run_cache(
    State(state): State<AppState>,
    Path(raw_type): Path<String>,
    Query(params): Query<RunParams>,
) -> Result<Json<Value>, ApiError> {
    let caching_type = parse_type(&raw_type)?;

    match state.orchestrators.run(caching_type, params.user).await? {
        RunOutcome::Completed(result) => Ok(Json(json!({
            "status": "completed",
            "result": result,
        }))),
        RunOutcome::Skipped(reason) => Ok(Json(json!({
            "status": "skipped",
            "reason": reason.as_str(),
        }))),
    }
}

/// `GET /api/cache/{type}/results` -- ledger entries, newest first.
#[instrument(skip_all, fields(caching_type = %raw_type))]
pub async fn list_results(
    State(state): State<AppState>,
    Path(raw_type): Path<String>,
) -> Result<Json<Vec<CachingResult>>, ApiError> {
    let caching_type = parse_type(&raw_type)?;
    let results = caching_results::list_for_type(&state.pool, caching_type)
        .await
        .map_err(|e| {
            error!(error = ?e, "failed to list caching results");
            ApiError::internal_error("Failed to list caching results")
        })?;
    Ok(Json(results))
}

/// `DELETE /api/cache/{type}/records` -- administrative reset of the cached
/// entity records of one type. The result ledger is untouched.
#[instrument(skip_all, fields(caching_type = %raw_type))]
pub async fn purge_records(
    State(state): State<AppState>,
    Path(raw_type): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let caching_type = parse_type(&raw_type)?;

    let removed = match caching_type {
        CachingType::Weeks => weeks::delete_all(&state.pool).await,
        CachingType::Classes => classes::delete_all(&state.pool).await,
        CachingType::Games => games::delete_all(&state.pool).await,
        CachingType::Tables => tables::delete_all(&state.pool).await,
    }
    .map_err(|e| {
        error!(error = ?e, "failed to purge cached records");
        ApiError::internal_error("Failed to purge cached records")
    })?;

    info!(caching_type = %caching_type, removed, "Cached records purged");
    Ok(Json(json!({ "removed": removed })))
}

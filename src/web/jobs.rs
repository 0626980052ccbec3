//! Job CRUD handlers. Validation beyond schedule syntax and name
//! uniqueness (auth, payload shape) lives in the surrounding layer.

use axum::extract::{Path, State};
use axum::response::Json;
use serde::Deserialize;
use tracing::{error, instrument};

use crate::data::jobs::{self, JobChanges};
use crate::data::models::{CachingType, Job};
use crate::state::AppState;
use crate::web::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub name: String,
    pub caching_type: CachingType,
    pub schedule_expression: String,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobRequest {
    pub name: Option<String>,
    pub caching_type: Option<CachingType>,
    pub schedule_expression: Option<String>,
    pub disabled: Option<bool>,
}

#[instrument(skip_all)]
pub async fn list_jobs(State(state): State<AppState>) -> Result<Json<Vec<Job>>, ApiError> {
    let all = jobs::list(&state.pool).await.map_err(|e| {
        error!(error = ?e, "failed to list jobs");
        ApiError::internal_error("Failed to list jobs")
    })?;
    Ok(Json(all))
}

#[instrument(skip_all, fields(name = %request.name))]
pub async fn create_job(
    State(state): State<AppState>,
    Json(request): Json<CreateJobRequest>,
) -> Result<Json<Job>, ApiError> {
    let job = state
        .scheduler
        .create_job(crate::scheduler::NewJobDef {
            name: request.name,
            caching_type: request.caching_type,
            schedule_expression: request.schedule_expression,
            disabled: request.disabled,
        })
        .await?;
    Ok(Json(job))
}

#[instrument(skip_all, fields(job_id = id))]
pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateJobRequest>,
) -> Result<Json<Job>, ApiError> {
    let job = state
        .scheduler
        .update_job(
            id,
            JobChanges {
                name: request.name,
                caching_type: request.caching_type,
                schedule_expression: request.schedule_expression,
                disabled: request.disabled,
            },
        )
        .await?;
    Ok(Json(job))
}

#[instrument(skip_all, fields(job_id = id))]
pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.scheduler.delete_job(id).await?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}

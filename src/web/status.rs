//! Health handler.

use axum::extract::State;
use axum::response::Json;
use serde_json::{Value, json};
use tracing::trace;

use crate::data::health;
use crate::state::AppState;
use crate::web::error::ApiError;

/// Liveness probe including a database ping.
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    trace!("health check requested");
    health::ping(&state.pool)
        .await
        .map_err(|_| ApiError::internal_error("Database unreachable"))?;

    Ok(Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}

//! Router construction for the REST boundary.

use std::time::Duration;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::web::{caching, jobs, status};

pub fn create_router(state: AppState) -> Router {
    let api_router = Router::new()
        .route("/health", get(status::health))
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs", post(jobs::create_job))
        .route("/jobs/{id}", put(jobs::update_job))
        .route("/jobs/{id}", delete(jobs::delete_job))
        .route("/cache/{type}", post(caching::run_cache))
        .route("/cache/{type}/results", get(caching::list_results))
        .route("/cache/{type}/records", delete(caching::purge_records))
        .with_state(state);

    Router::new().nest("/api", api_router).layer((
        TraceLayer::new_for_http(),
        // Generous because a games run issues one upstream call per week.
        TimeoutLayer::new(Duration::from_secs(120)),
        CorsLayer::permissive(),
    ))
}

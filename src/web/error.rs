//! JSON error envelope for the REST boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::cache::CacheError;
use crate::scheduler::SchedulerError;

/// An error response: HTTP status plus a human-readable message, rendered
/// as `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
        }
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: message.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<SchedulerError> for ApiError {
    fn from(e: SchedulerError) -> Self {
        match e {
            SchedulerError::InvalidSchedule(..) => ApiError::bad_request(e.to_string()),
            SchedulerError::DuplicateJobName(_) => ApiError::conflict(e.to_string()),
            SchedulerError::JobNotFound(_) => ApiError::not_found(e.to_string()),
            SchedulerError::Storage(_) => {
                tracing::error!(error = ?e, "job storage operation failed");
                ApiError::internal_error("Storage unavailable")
            }
        }
    }
}

impl From<CacheError> for ApiError {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::Source(source) => {
                tracing::error!(error = ?source, "cache run aborted by source failure");
                ApiError::bad_gateway("HVW endpoint unavailable")
            }
            CacheError::Storage(storage) => {
                tracing::error!(error = ?storage, "cache run aborted by storage failure");
                ApiError::internal_error("Storage unavailable")
            }
        }
    }
}

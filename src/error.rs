// src/error.rs
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// HTTP-facing error taxonomy. Every handler failure maps onto one of these;
/// the JSON body is always `{"error": ..., "details"?: ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    AccessDenied(&'static str),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("AI service request failed: {0}")]
    Upstream(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::AccessDenied(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) | ApiError::Database(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }

        // Database details stay in the logs; clients get a generic message.
        let body = match &self {
            ApiError::Upstream(details) => {
                json!({"error": "AI service request failed", "details": details})
            }
            ApiError::Database(_) => json!({"error": "Internal server error"}),
            ApiError::Internal(_) => json!({"error": "Internal server error"}),
            other => json!({"error": other.to_string()}),
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AccessDenied => ApiError::AccessDenied("Access denied"),
            StoreError::NotFound(what) => ApiError::NotFound(what),
            StoreError::Database(e) => ApiError::Database(e),
        }
    }
}

impl From<crate::ai_client::AiServiceError> for ApiError {
    fn from(err: crate::ai_client::AiServiceError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

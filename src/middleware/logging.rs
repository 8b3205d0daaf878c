// src/middleware/logging.rs
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Extension, MatchedPath, Request},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::AppState;

/// Structured request logging. Completions are also recorded into the
/// diagnostics ring so clients can poll them via /api/logs.
pub async fn request_logging_middleware(
    Extension(state): Extension<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let start = Instant::now();
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().clone();
    let uri = req.uri().clone();
    let matched_path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_owned())
        .unwrap_or_else(|| uri.path().to_owned());

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %matched_path,
        "incoming request"
    );

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status();
    let summary = format!(
        "{} {} -> {} ({}ms)",
        method,
        matched_path,
        status.as_u16(),
        duration.as_millis()
    );

    match status.as_u16() {
        200..=399 => {
            tracing::info!(
                request_id = %request_id,
                status = %status.as_u16(),
                duration_ms = %duration.as_millis(),
                "request completed"
            );
            state.diagnostics.record("info", summary);
        }
        400..=499 => {
            tracing::warn!(
                request_id = %request_id,
                status = %status.as_u16(),
                duration_ms = %duration.as_millis(),
                "request completed (client error)"
            );
            state.diagnostics.record("warn", summary);
        }
        _ => {
            tracing::error!(
                request_id = %request_id,
                status = %status.as_u16(),
                duration_ms = %duration.as_millis(),
                "request completed (server error)"
            );
            state.diagnostics.record("error", summary);
        }
    }

    Ok(response)
}

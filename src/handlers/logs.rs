// src/handlers/logs.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::Json,
    routing::{get, Router},
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::AppState;

pub fn log_routes() -> Router {
    Router::new().route("/api/logs", get(get_logs))
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    #[serde(rename = "lastId")]
    last_id: Option<u64>,
}

async fn get_logs(
    Query(params): Query<LogsQuery>,
    Extension(state): Extension<Arc<AppState>>,
) -> Json<Value> {
    let (logs, last_id) = state.diagnostics.entries_after(params.last_id.unwrap_or(0));
    Json(json!({"logs": logs, "lastId": last_id}))
}

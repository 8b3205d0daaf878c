// src/handlers/query.rs
//
// The /api/query flow: resolve the conversation, forward the question (with
// the session's memory window) to the AI service, normalize what comes back,
// then persist the exchange. A failed upstream call fails the whole request
// with nothing persisted; a persistence failure after a successful upstream
// call is a 500 and the computed answer is lost to this client.

use std::sync::Arc;

use axum::{
    extract::Extension,
    response::Json,
    routing::{post, Router},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::ai_client::UpstreamQueryRequest;
use crate::error::ApiError;
use crate::models::chat::append_exchange;
use crate::normalize::{normalize_query_response, QueryAnswer};
use crate::store::ConversationStore;
use crate::AppState;

pub fn query_routes() -> Router {
    Router::new().route("/api/query", post(submit_query))
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: Option<String>,
    pub org_query: Option<String>,
    pub chat_id: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: Option<i32>,
}

async fn submit_query(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryAnswer>, ApiError> {
    let query = payload
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::Validation("Query is required".to_string()))?;
    let user_id = payload
        .user_id
        .ok_or_else(|| ApiError::Validation("User ID is required".to_string()))?;
    let org_query = payload
        .org_query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .unwrap_or(query);

    let chat_id = payload
        .chat_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let store = ConversationStore::new(state.db_pool.clone());

    // A memory read failure degrades to an empty context rather than
    // aborting the query.
    let mut memory = match store.get_memory(&chat_id).await {
        Ok(messages) => messages,
        Err(e) => {
            tracing::warn!("Failed to load memory for chat {}: {}", chat_id, e);
            Vec::new()
        }
    };

    state
        .diagnostics
        .record("info", format!("query received for chat {}", chat_id));

    let upstream = state
        .ai
        .query(&UpstreamQueryRequest {
            query,
            org_query,
            chat_id: &chat_id,
            user_id,
            memory: &memory,
        })
        .await
        .map_err(|e| {
            state
                .diagnostics
                .record("error", format!("AI service query failed: {}", e));
            ApiError::Upstream(e.to_string())
        })?;

    let mut answer = normalize_query_response(upstream, org_query);

    let chat_name = answer.chat_name.clone().unwrap_or_else(|| {
        format!("Chat {}", chrono::Utc::now().format("%Y-%m-%d %H:%M"))
    });

    store.ensure_session(&chat_id, &chat_name, user_id).await?;
    store.append_history(&chat_id, user_id, org_query, &answer).await?;

    append_exchange(&mut memory, query, &answer.answer);
    store.put_memory(&chat_id, &memory).await?;

    answer.chat_id = Some(chat_id);
    Ok(Json(answer))
}

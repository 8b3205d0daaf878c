// src/handlers/chat.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    response::Json,
    routing::{delete, get, post, Router},
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::models::chat::{ChatHistoryEntry, SessionPreview};
use crate::store::ConversationStore;
use crate::AppState;

pub fn chat_routes() -> Router {
    Router::new()
        .route("/api/chat-list", get(chat_list))
        .route("/api/chat-history/:chat_id", get(chat_history))
        .route("/api/chat", delete(delete_chat))
        .route("/api/update-chat-favorite", post(update_chat_favorite))
        .route("/api/update-chat-name", post(update_chat_name))
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    #[serde(rename = "userId")]
    user_id: Option<i32>,
}

fn require_user(user_id: Option<i32>) -> Result<i32, ApiError> {
    user_id.ok_or_else(|| ApiError::Validation("User ID is required".to_string()))
}

async fn chat_list(
    Query(params): Query<UserQuery>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<SessionPreview>>, ApiError> {
    let user_id = require_user(params.user_id)?;
    let store = ConversationStore::new(state.db_pool.clone());
    let sessions = store.list_sessions(user_id).await?;
    Ok(Json(sessions))
}

async fn chat_history(
    Path(chat_id): Path<String>,
    Query(params): Query<UserQuery>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<ChatHistoryEntry>>, ApiError> {
    let user_id = require_user(params.user_id)?;
    let store = ConversationStore::new(state.db_pool.clone());
    let history = store.get_history(&chat_id, user_id).await?;
    Ok(Json(history))
}

#[derive(Debug, Deserialize)]
struct DeleteChatRequest {
    #[serde(rename = "chatId")]
    chat_id: Option<String>,
    #[serde(rename = "userId")]
    user_id: Option<i32>,
}

async fn delete_chat(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<DeleteChatRequest>,
) -> Result<Json<Value>, ApiError> {
    let chat_id = payload
        .chat_id
        .ok_or_else(|| ApiError::Validation("Chat ID is required".to_string()))?;
    let user_id = require_user(payload.user_id)?;

    let store = ConversationStore::new(state.db_pool.clone());
    store.delete_session(&chat_id, user_id).await?;

    tracing::info!("Deleted chat {} for user {}", chat_id, user_id);
    Ok(Json(json!({"message": "Chat deleted successfully"})))
}

#[derive(Debug, Deserialize)]
struct FavoriteRequest {
    #[serde(rename = "chatId")]
    chat_id: Option<String>,
    #[serde(rename = "userId")]
    user_id: Option<i32>,
    favorite: Option<bool>,
}

async fn update_chat_favorite(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<FavoriteRequest>,
) -> Result<Json<Value>, ApiError> {
    let chat_id = payload
        .chat_id
        .ok_or_else(|| ApiError::Validation("Chat ID is required".to_string()))?;
    let user_id = require_user(payload.user_id)?;
    let favorite = payload
        .favorite
        .ok_or_else(|| ApiError::Validation("Favorite flag is required".to_string()))?;

    let store = ConversationStore::new(state.db_pool.clone());
    store.set_favorite(&chat_id, user_id, favorite).await?;

    Ok(Json(json!({"message": "Favorite updated successfully"})))
}

#[derive(Debug, Deserialize)]
struct RenameRequest {
    #[serde(rename = "chatId")]
    chat_id: Option<String>,
    #[serde(rename = "userId")]
    user_id: Option<i32>,
    name: Option<String>,
}

async fn update_chat_name(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<RenameRequest>,
) -> Result<Json<Value>, ApiError> {
    let chat_id = payload
        .chat_id
        .ok_or_else(|| ApiError::Validation("Chat ID is required".to_string()))?;
    let user_id = require_user(payload.user_id)?;
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::Validation("Chat name is required".to_string()))?;

    let store = ConversationStore::new(state.db_pool.clone());
    store.rename_session(&chat_id, user_id, name).await?;

    Ok(Json(json!({"message": "Chat renamed successfully"})))
}

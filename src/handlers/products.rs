// src/handlers/products.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    response::Json,
    routing::{get, post, Router},
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::models::product::{CreateProductRequest, Product, UpdateProductRequest};
use crate::store::ProductStore;
use crate::AppState;

pub fn product_routes() -> Router {
    Router::new()
        .route("/api/products", get(list_products).post(create_product))
        .route(
            "/api/products/:id",
            axum::routing::put(update_product).delete(delete_product),
        )
        .route("/api/random-product-queries", get(random_product_queries))
        .route("/api/generate-product-queries", post(generate_product_queries))
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    #[serde(rename = "userId")]
    user_id: Option<i32>,
}

fn require_user(user_id: Option<i32>) -> Result<i32, ApiError> {
    user_id.ok_or_else(|| ApiError::Validation("User ID is required".to_string()))
}

async fn list_products(
    Query(params): Query<UserQuery>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let user_id = require_user(params.user_id)?;
    let store = ProductStore::new(state.db_pool.clone());
    Ok(Json(store.list(user_id).await?))
}

async fn create_product(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<Json<Product>, ApiError> {
    let user_id = require_user(payload.user_id)?;
    let title = payload
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Validation("Product title is required".to_string()))?;

    let store = ProductStore::new(state.db_pool.clone());
    let product = store.create(user_id, title, &payload.info).await?;

    tracing::info!(
        "Created product {} ({}) for user {}",
        product.id,
        product.color,
        user_id
    );
    Ok(Json(product))
}

async fn update_product(
    Path(id): Path<i32>,
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<Product>, ApiError> {
    let user_id = require_user(payload.user_id)?;

    let store = ProductStore::new(state.db_pool.clone());
    let product = store
        .update(
            id,
            user_id,
            payload.title.as_deref(),
            payload.info.as_deref(),
            payload.color.as_deref(),
        )
        .await?;

    Ok(Json(product))
}

async fn delete_product(
    Path(id): Path<i32>,
    Query(params): Query<UserQuery>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let user_id = require_user(params.user_id)?;

    let store = ProductStore::new(state.db_pool.clone());
    store.delete(id, user_id).await?;

    Ok(Json(json!({"message": "Product deleted successfully"})))
}

async fn random_product_queries(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let queries = state.ai.random_product_queries().await?;
    Ok(Json(queries))
}

#[derive(Debug, Deserialize)]
struct GenerateQueriesRequest {
    title: Option<String>,
    info: Option<String>,
}

async fn generate_product_queries(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<GenerateQueriesRequest>,
) -> Result<Json<Value>, ApiError> {
    let title = payload
        .title
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Validation("Product title and info are required".to_string()))?;
    let info = payload.info.as_deref().unwrap_or("");

    let queries = state.ai.generate_product_queries(title, info).await?;
    Ok(Json(queries))
}

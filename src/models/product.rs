// src/models/product.rs
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub info: String,
    pub color: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    #[serde(rename = "userId")]
    pub user_id: Option<i32>,
    pub title: Option<String>,
    #[serde(default)]
    pub info: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    #[serde(rename = "userId")]
    pub user_id: Option<i32>,
    pub title: Option<String>,
    pub info: Option<String>,
    pub color: Option<String>,
}

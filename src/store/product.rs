// src/store/product.rs
use sqlx::PgPool;

use crate::models::product::Product;
use crate::store::StoreError;

/// Fixed palette; new products take the first color the user does not
/// already hold.
pub const COLOR_PALETTE: [&str; 6] = ["red", "purple", "orange", "green", "blue", "white"];

/// First palette color absent from `existing`, or the first palette color
/// when every one is taken.
pub fn pick_color(existing: &[String]) -> &'static str {
    COLOR_PALETTE
        .iter()
        .find(|color| !existing.iter().any(|held| held == *color))
        .copied()
        .unwrap_or(COLOR_PALETTE[0])
}

pub struct ProductStore {
    db_pool: PgPool,
}

impl ProductStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn list(&self, user_id: i32) -> Result<Vec<Product>, StoreError> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT id, user_id, title, info, color, created_at
             FROM products
             WHERE user_id = $1
             ORDER BY id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(products)
    }

    pub async fn create(&self, user_id: i32, title: &str, info: &str) -> Result<Product, StoreError> {
        let existing_colors =
            sqlx::query_scalar::<_, String>("SELECT color FROM products WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.db_pool)
                .await?;

        let color = pick_color(&existing_colors);

        let product = sqlx::query_as::<_, Product>(
            "INSERT INTO products (user_id, title, info, color)
             VALUES ($1, $2, $3, $4)
             RETURNING id, user_id, title, info, color, created_at",
        )
        .bind(user_id)
        .bind(title)
        .bind(info)
        .bind(color)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(product)
    }

    pub async fn update(
        &self,
        id: i32,
        user_id: i32,
        title: Option<&str>,
        info: Option<&str>,
        color: Option<&str>,
    ) -> Result<Product, StoreError> {
        self.verify_owner(id, user_id).await?;

        let product = sqlx::query_as::<_, Product>(
            "UPDATE products
             SET title = COALESCE($1, title),
                 info = COALESCE($2, info),
                 color = COALESCE($3, color)
             WHERE id = $4
             RETURNING id, user_id, title, info, color, created_at",
        )
        .bind(title)
        .bind(info)
        .bind(color)
        .bind(id)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(product)
    }

    pub async fn delete(&self, id: i32, user_id: i32) -> Result<(), StoreError> {
        self.verify_owner(id, user_id).await?;

        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;

        Ok(())
    }

    async fn verify_owner(&self, id: i32, user_id: i32) -> Result<(), StoreError> {
        let owner = sqlx::query_scalar::<_, i32>("SELECT user_id FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;

        match owner {
            None => Err(StoreError::NotFound("product")),
            Some(owner) if owner != user_id => Err(StoreError::AccessDenied),
            Some(_) => Ok(()),
        }
    }
}

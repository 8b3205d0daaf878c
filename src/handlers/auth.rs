// src/handlers/auth.rs
use std::sync::Arc;

use axum::{
    extract::Extension,
    response::Json,
    routing::{post, Router},
};
use bcrypt::{hash, verify, DEFAULT_COST};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::models::auth::{LoginRequest, LoginResponse, SignupRequest, User};
use crate::AppState;

pub fn auth_routes() -> Router {
    Router::new()
        .route("/api/signup", post(signup))
        .route("/api/login", post(login))
}

async fn signup(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<Value>, ApiError> {
    if payload.username.is_empty() || payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "Username, email, and password are required".to_string(),
        ));
    }

    let existing = sqlx::query("SELECT id FROM users WHERE username = $1 OR email = $2")
        .bind(&payload.username)
        .bind(&payload.email)
        .fetch_optional(&state.db_pool)
        .await?;

    if existing.is_some() {
        return Err(ApiError::Validation(
            "User with this username or email already exists".to_string(),
        ));
    }

    let password_hash = hash(&payload.password, DEFAULT_COST).map_err(|e| {
        tracing::error!("Error hashing password: {}", e);
        ApiError::Internal("Failed to create user".to_string())
    })?;

    let user_id = sqlx::query_scalar::<_, i32>(
        "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(&password_hash)
    .fetch_one(&state.db_pool)
    .await?;

    tracing::info!("Created user {} ({})", payload.username, user_id);

    Ok(Json(json!({
        "message": "User created successfully",
        "userId": user_id
    })))
}

async fn login(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "Username and password are required".to_string(),
        ));
    }

    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash, created_at FROM users WHERE username = $1",
    )
    .bind(&payload.username)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or(ApiError::AccessDenied("Invalid username or password"))?;

    match verify(&payload.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => return Err(ApiError::AccessDenied("Invalid username or password")),
        Err(e) => {
            tracing::error!("Error verifying password: {}", e);
            return Err(ApiError::Internal("Login failed".to_string()));
        }
    }

    Ok(Json(LoginResponse {
        user_id: user.id,
        username: user.username,
    }))
}

use axum::http::StatusCode;
use axum::response::Json;
use axum::{routing::get, Extension, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

mod ai_client;
mod db;
mod diagnostics;
mod error;
mod handlers;
mod middleware;
mod models;
mod normalize;
mod related_queries;
mod retry;
mod store;

// AppState holds the database pool, the AI backend client, a plain HTTP
// client for the proxy endpoints, and the diagnostics ring.
pub struct AppState {
    pub db_pool: sqlx::PgPool,
    pub ai: ai_client::AiServiceClient,
    pub http_client: reqwest::Client,
    pub diagnostics: diagnostics::Diagnostics,
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging().expect("Failed to initialize logging");

    // Create the database connection pool and apply the schema
    let db_pool = db::create_pool()
        .await
        .expect("Failed to create database pool.");

    let ai_base_url = std::env::var("AI_SERVICE_URL")
        .unwrap_or_else(|_| "http://localhost:8000".to_string());
    tracing::info!("AI backend service: {}", ai_base_url);

    let shared_state = Arc::new(AppState {
        db_pool,
        ai: ai_client::AiServiceClient::new(ai_base_url),
        http_client: reqwest::Client::new(),
        diagnostics: diagnostics::Diagnostics::new(),
    });

    // Build our application with all routes and shared state
    let app = Router::new()
        .merge(handlers::auth::auth_routes())
        .merge(handlers::chat::chat_routes())
        .merge(handlers::query::query_routes())
        .merge(handlers::products::product_routes())
        .merge(handlers::pdf::pdf_routes())
        .merge(handlers::proxy::proxy_routes())
        .merge(handlers::logs::log_routes())
        .route("/api/status", get(api_status))
        .fallback(api_not_found)
        .layer(axum::middleware::from_fn(
            middleware::logging::request_logging_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(Extension(shared_state.clone()));

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(3000);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .unwrap();
    tracing::info!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.unwrap();
}

// Production-grade logging configuration
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, fmt, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,compliance_navigator=trace,sqlx=info,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,compliance_navigator=info,sqlx=warn,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    // JSON logging for production log aggregation, human-readable otherwise
    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Compliance Navigator backend starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Build mode: {}",
        if cfg!(debug_assertions) { "development" } else { "production" }
    );

    Ok(())
}

// API health check
async fn api_status(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let db_status = match sqlx::query("SELECT 1").fetch_one(&state.db_pool).await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    Json(json!({
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "database": db_status,
            "ai_service": state.ai.base_url(),
        }
    }))
}

async fn api_not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({"error": "Not found"})))
}

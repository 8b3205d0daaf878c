// src/handlers/pdf.rs
//
// Document endpoints. Upload/search/delete/update are forwarded to the AI
// service, which owns extraction and indexing; /api/pdf streams the stored
// bytes straight out of the shared pdfdata table.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Extension, Multipart, Path, Query},
    http::header,
    response::{IntoResponse, Json},
    routing::{delete, get, post, put, Router},
};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::AppState;

pub fn pdf_routes() -> Router {
    Router::new()
        .route("/api/upload-pdf", post(upload_pdf))
        .layer(DefaultBodyLimit::max(50 * 1024 * 1024))
        .route("/api/search-pdfs", get(search_pdfs))
        .route("/api/delete-pdf/:name", delete(delete_pdf))
        .route("/api/update-pdf-info/:name", put(update_pdf_info))
        .route("/api/pdf", get(get_pdf))
}

async fn upload_pdf(
    Extension(state): Extension<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut user_id: Option<i32> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("Invalid multipart payload".to_string()))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                let filename = field.file_name().unwrap_or("document.pdf").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::Validation("Failed to read uploaded file".to_string()))?;
                file = Some((filename, data.to_vec()));
            }
            "userId" => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::Validation("Invalid userId field".to_string()))?;
                user_id = text.trim().parse::<i32>().ok();
            }
            other => {
                tracing::debug!("Ignoring unexpected multipart field '{}'", other);
            }
        }
    }

    let (filename, bytes) =
        file.ok_or_else(|| ApiError::Validation("PDF file is required".to_string()))?;
    let user_id =
        user_id.ok_or_else(|| ApiError::Validation("User ID is required".to_string()))?;
    if bytes.is_empty() {
        return Err(ApiError::Validation("Empty file received".to_string()));
    }

    tracing::info!(
        "Forwarding PDF upload '{}' ({} bytes) for user {}",
        filename,
        bytes.len(),
        user_id
    );

    let result = state.ai.upload_pdf(&filename, bytes, user_id).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct SearchPdfsQuery {
    search_query: Option<String>,
    #[serde(rename = "userId")]
    user_id: Option<i32>,
}

async fn search_pdfs(
    Query(params): Query<SearchPdfsQuery>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let user_id = params
        .user_id
        .ok_or_else(|| ApiError::Validation("User ID is required".to_string()))?;

    let results = state
        .ai
        .search_pdfs(params.search_query.as_deref(), user_id)
        .await?;
    Ok(Json(results))
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    #[serde(rename = "userId")]
    user_id: Option<i32>,
}

async fn delete_pdf(
    Path(name): Path<String>,
    Query(params): Query<UserQuery>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let user_id = params
        .user_id
        .ok_or_else(|| ApiError::Validation("User ID is required".to_string()))?;

    let result = state.ai.delete_pdf(&name, user_id).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct UpdatePdfInfoQuery {
    new_info: Option<String>,
    #[serde(rename = "userId")]
    user_id: Option<i32>,
}

async fn update_pdf_info(
    Path(name): Path<String>,
    Query(params): Query<UpdatePdfInfoQuery>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let user_id = params
        .user_id
        .ok_or_else(|| ApiError::Validation("User ID is required".to_string()))?;
    let new_info = params
        .new_info
        .ok_or_else(|| ApiError::Validation("new_info is required".to_string()))?;

    let result = state.ai.update_pdf_info(&name, &new_info, user_id).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct PdfQuery {
    name: Option<String>,
    #[serde(rename = "userId")]
    user_id: Option<i32>,
    // Page anchoring happens client-side; the full document is returned.
    page: Option<i32>,
}

async fn get_pdf(
    Query(params): Query<PdfQuery>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let name = params
        .name
        .ok_or_else(|| ApiError::Validation("PDF name is required".to_string()))?;
    let user_id = params
        .user_id
        .ok_or_else(|| ApiError::Validation("User ID is required".to_string()))?;

    let row = sqlx::query_as::<_, (Option<i32>, Option<Vec<u8>>)>(
        "SELECT user_id, pdf_file FROM pdfdata WHERE pdf_name = $1",
    )
    .bind(&name)
    .fetch_optional(&state.db_pool)
    .await?;

    let (owner, bytes) = row.ok_or(ApiError::NotFound("PDF"))?;
    if owner != Some(user_id) {
        return Err(ApiError::AccessDenied("Access denied"));
    }
    let bytes = bytes.ok_or(ApiError::NotFound("PDF"))?;

    tracing::debug!(
        "Serving PDF '{}' ({} bytes) for user {}, page {:?}",
        name,
        bytes.len(),
        user_id,
        params.page
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}.pdf\"", name),
            ),
        ],
        bytes,
    ))
}

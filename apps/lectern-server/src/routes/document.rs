//! Document Routes
//!
//! Endpoints:
//! - POST /api/v1/document - Upload a PDF (multipart field `file`)
//! - GET /api/v1/document - Summary of the loaded document
//! - GET /api/v1/document/pages/:page - Text of one page

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::document::DocumentSummary;
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub document: DocumentSummary,
    pub message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub number: usize,
    pub total_pages: usize,
    /// Page text, or a bracketed marker when the page has none
    pub text: String,
    pub readable: bool,
    pub from_ocr: bool,
}

/// Create the document router
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(get_document).post(upload_document))
        .route("/pages/:page", get(get_page))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// POST /api/v1/document
async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read upload: {}", e))
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().map(|s| s.to_string());
        let data = field.bytes().await.map_err(|e| {
            tracing::error!("Failed to read file data: {}", e);
            AppError::BadRequest(format!("Failed to read file data: {}", e))
        })?;
        tracing::debug!(filename = ?filename, size = data.len(), "Received upload");

        let document = state.load_upload(&data).await?;
        let message = format!(
            "Successfully loaded PDF with {} pages",
            document.total_pages
        );
        return Ok(Json(UploadResponse { document, message }));
    }

    tracing::warn!("No file field found in multipart upload");
    Err(AppError::BadRequest(
        "No file provided. Use field name 'file'".to_string(),
    ))
}

/// GET /api/v1/document
async fn get_document(State(state): State<AppState>) -> Result<Json<DocumentSummary>> {
    state
        .controller()
        .document()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No document is loaded".to_string()))
}

/// GET /api/v1/document/pages/:page
async fn get_page(
    State(state): State<AppState>,
    Path(number): Path<usize>,
) -> Result<Json<PageResponse>> {
    let controller = state.controller();
    let page = controller
        .page(number)
        .ok_or_else(|| AppError::NotFound(format!("Page {} not found", number)))?;

    Ok(Json(PageResponse {
        number: page.number,
        total_pages: controller.snapshot().total_pages,
        text: page.display_text(),
        readable: page.text.is_readable(),
        from_ocr: page.from_ocr,
    }))
}

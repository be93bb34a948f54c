//! Error types for the Lectern server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::cache::CacheError;
use crate::document::LoadError;
use crate::reader::ReaderError;
use crate::speech::EngineError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Load(e) => {
                tracing::warn!("Load error: {}", e);
                match e {
                    LoadError::Io(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "io_error",
                        "Failed to read the uploaded file".to_string(),
                    ),
                    _ => (StatusCode::UNPROCESSABLE_ENTITY, "load_error", e.to_string()),
                }
            }
            AppError::Reader(ReaderError::NoDocument) => (
                StatusCode::CONFLICT,
                "no_document",
                "Upload a PDF before starting playback".to_string(),
            ),
            AppError::Reader(ReaderError::Engine(e)) => {
                tracing::error!("Speech engine error: {}", e);
                let status = match e {
                    EngineError::Init(_) | EngineError::NotInitialized => {
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                    EngineError::Synthesis(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, "engine_error", e.to_string())
            }
            AppError::Cache(e) => {
                tracing::error!("Cache error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "cache_error",
                    "Failed to store the uploaded file".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::NotFound("page".into()), StatusCode::NOT_FOUND),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                AppError::Load(LoadError::Encrypted),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AppError::Reader(ReaderError::NoDocument),
                StatusCode::CONFLICT,
            ),
            (
                AppError::Reader(ReaderError::Engine(EngineError::Init("gone".into()))),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}

//! OCR Types
//!
//! Defines types for OCR fallback on scanned PDF pages.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// OCR provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrProvider {
    /// Tesseract OCR (local binary)
    Tesseract,
}

impl Default for OcrProvider {
    fn default() -> Self {
        Self::Tesseract
    }
}

/// When the loader falls back to OCR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrMode {
    /// Never run OCR
    Off,
    /// Only when no page of the document has a text layer
    Document,
    /// For every page without a text layer
    Page,
}

impl FromStr for OcrMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "off" | "none" | "disabled" => Ok(Self::Off),
            "document" | "doc" => Ok(Self::Document),
            "page" | "per-page" => Ok(Self::Page),
            other => Err(format!("unknown OCR mode: {}", other)),
        }
    }
}

/// OCR result for one page image
#[derive(Debug, Clone, Serialize)]
pub struct OcrResult {
    /// Recognized text, trimmed
    pub text: String,
    /// Provider used
    pub provider: OcrProvider,
}

/// OCR error types
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR provider not available: {0}")]
    ProviderNotAvailable(String),

    #[error("Failed to rasterize page {page}: {reason}")]
    RasterizeError { page: usize, reason: String },

    #[error("OCR processing failed: {0}")]
    ProcessingError(String),

    #[error("Invalid language code: {0}")]
    InvalidLanguage(String),
}

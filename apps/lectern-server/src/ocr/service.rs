//! OCR Service
//!
//! Orchestrates page rasterization and the OCR provider.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::OcrConfig;

use super::{
    provider::{OcrProviderTrait, TesseractProvider},
    rasterize::{PageRasterizer, PdftoppmRasterizer},
    types::OcrError,
};

/// OCR service for scanned PDF pages
///
/// Availability is a capability probed once; absence only means reduced
/// functionality.
pub struct OcrService {
    provider: Arc<dyn OcrProviderTrait>,
    rasterizer: Arc<dyn PageRasterizer>,
    language: String,
    available: AtomicBool,
}

impl OcrService {
    /// Create a service; call [`OcrService::probe`] before relying on it
    pub fn new(
        provider: Arc<dyn OcrProviderTrait>,
        rasterizer: Arc<dyn PageRasterizer>,
        language: &str,
    ) -> Self {
        Self {
            provider,
            rasterizer,
            language: language.to_string(),
            available: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(
            Arc::new(TesseractProvider::new(config.tesseract_path.clone())),
            Arc::new(PdftoppmRasterizer::new(config.pdftoppm_path.clone(), config.dpi)),
            &config.language,
        )
    }

    /// Check the external tools and remember the result
    pub async fn probe(&self) -> bool {
        let provider_ok = self.provider.is_available().await;
        let rasterizer_ok = self.rasterizer.is_available().await;
        let available = provider_ok && rasterizer_ok;
        self.available.store(available, Ordering::SeqCst);

        if available {
            tracing::info!(provider = ?self.provider.provider_type(), "OCR initialized successfully");
        } else {
            tracing::warn!(
                provider_ok,
                rasterizer_ok,
                "OCR not available, scanned pages will be skipped"
            );
        }
        available
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// OCR one page of a PDF on disk, returning trimmed (possibly empty) text
    pub async fn ocr_page(&self, pdf_path: &Path, page: usize) -> Result<String, OcrError> {
        if !self.is_available() {
            return Err(OcrError::ProviderNotAvailable(
                "OCR requested but not available".to_string(),
            ));
        }

        tracing::info!(page, "Converting page to image for OCR");
        let image = self.rasterizer.rasterize(pdf_path, page).await?;

        tracing::debug!(page, bytes = image.len(), "Running OCR");
        let result = self.provider.recognize(&image, &self.language).await?;
        if result.text.is_empty() {
            tracing::warn!(page, "No text extracted using OCR");
        }
        Ok(result.text)
    }
}

//! Application state management

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::cache::UploadCache;
use crate::config::Config;
use crate::document::{looks_like_pdf, DocumentLoader, DocumentSummary, LoadError};
use crate::error::{AppError, Result};
use crate::ocr::{OcrMode, OcrService};
use crate::reader::{ControllerOptions, NoticeLevel, ReadingController};
use crate::session::SessionStore;
use crate::speech::{create_engine, VoiceEngine};

/// Progress of an upload being processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadProgress {
    /// Pages sent through OCR so far
    pub ocr_pages_done: usize,
    /// Pages queued for OCR; zero while the PDF is still being parsed
    pub ocr_pages_total: usize,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    controller: ReadingController,
    cache: UploadCache,
    loader: DocumentLoader,
    /// One upload is processed at a time
    load_lock: tokio::sync::Mutex<()>,
    loading: Mutex<Option<LoadProgress>>,
}

impl AppState {
    /// Build state around an explicit engine and OCR service
    pub async fn new(config: Config, engine: Arc<dyn VoiceEngine>, ocr: Arc<OcrService>) -> Self {
        let controller = ReadingController::restore(
            engine,
            SessionStore::new(&config.session.path),
            ControllerOptions::from(&config.speech),
        )
        .await;
        let cache = UploadCache::from_config(&config.cache);
        let loader = DocumentLoader::new(ocr, config.ocr.mode, config.document.parse_timeout);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                controller,
                cache,
                loader,
                load_lock: tokio::sync::Mutex::new(()),
                loading: Mutex::new(None),
            }),
        }
    }

    /// Build state from configuration, probing the OCR tools
    pub async fn from_config(config: Config) -> Self {
        let engine = create_engine(&config.speech);
        let ocr = Arc::new(OcrService::from_config(&config.ocr));
        if config.ocr.mode != OcrMode::Off {
            ocr.probe().await;
        }
        Self::new(config, engine, ocr).await
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn controller(&self) -> &ReadingController {
        &self.inner.controller
    }

    pub fn cache(&self) -> &UploadCache {
        &self.inner.cache
    }

    pub fn ocr_available(&self) -> bool {
        self.inner.loader.ocr_available()
    }

    pub fn loading(&self) -> Option<LoadProgress> {
        *self.inner.loading.lock()
    }

    /// Cache, parse and hand an uploaded PDF to the reading controller
    ///
    /// On failure the previously loaded document stays in place.
    pub async fn load_upload(&self, bytes: &[u8]) -> Result<DocumentSummary> {
        if bytes.is_empty() {
            return Err(LoadError::Empty.into());
        }
        if !looks_like_pdf(bytes) {
            return Err(AppError::BadRequest(
                "Uploaded file is not a PDF".to_string(),
            ));
        }

        let _guard = self.inner.load_lock.lock().await;
        // `stored.hold` keeps cleanup away from the file until it is protected
        let stored = self.inner.cache.store(bytes).await?;

        *self.inner.loading.lock() = Some(LoadProgress {
            ocr_pages_done: 0,
            ocr_pages_total: 0,
        });
        let progress = |done: usize, total: usize| {
            *self.inner.loading.lock() = Some(LoadProgress {
                ocr_pages_done: done,
                ocr_pages_total: total,
            });
        };
        let result = self
            .inner
            .loader
            .load(stored.id.clone(), stored.path.clone(), &progress)
            .await;
        *self.inner.loading.lock() = None;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                self.inner
                    .controller
                    .notify(NoticeLevel::Error, format!("Error loading PDF: {}", e));
                return Err(e.into());
            }
        };

        self.inner.cache.protect(Some(stored.path.clone()));
        let summary = self
            .inner
            .controller
            .load(outcome.document, outcome.warnings)
            .await;
        self.inner.cache.cleanup_if_due().await;
        Ok(summary)
    }

    /// Stop playback and save the session
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down application state...");
        self.inner.controller.shutdown().await;
    }
}

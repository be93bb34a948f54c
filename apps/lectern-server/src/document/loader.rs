//! Document loading pipeline
//!
//! Opens a PDF, extracts every page, and applies the OCR fallback.
//! Page-level failures never abort the load: they become the
//! unreadable-page sentinel.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::ocr::{OcrMode, OcrService};

use super::error::LoadError;
use super::source::{PageSource, PdfSource};
use super::types::{Document, Page, PageText, UnreadableReason};

/// Progress callback for OCR (pages done, pages queued)
pub type OcrProgress<'a> = &'a (dyn Fn(usize, usize) + Send + Sync);

/// Result of a successful load
#[derive(Debug)]
pub struct LoadOutcome {
    pub document: Document,
    /// Non-fatal problems worth showing to the user
    pub warnings: Vec<String>,
}

pub struct DocumentLoader {
    ocr: Arc<OcrService>,
    ocr_mode: OcrMode,
    parse_timeout: Duration,
}

impl DocumentLoader {
    pub fn new(ocr: Arc<OcrService>, ocr_mode: OcrMode, parse_timeout: Duration) -> Self {
        Self {
            ocr,
            ocr_mode,
            parse_timeout,
        }
    }

    pub fn ocr_available(&self) -> bool {
        self.ocr_mode != OcrMode::Off && self.ocr.is_available()
    }

    /// Open and fully extract the PDF at `path`
    pub async fn load(
        &self,
        id: String,
        path: PathBuf,
        progress: OcrProgress<'_>,
    ) -> Result<LoadOutcome, LoadError> {
        tracing::info!(path = %path.display(), "Loading PDF");

        let blocking_path = path.clone();
        // Parsing is CPU-bound; keep it off the async workers
        let extracted = timeout(
            self.parse_timeout,
            tokio::task::spawn_blocking(move || {
                let source = PdfSource::open(&blocking_path)?;
                Ok::<_, LoadError>(extract_pages(&source))
            }),
        )
        .await;

        let (title, pages) = match extracted {
            Ok(Ok(result)) => result?,
            Ok(Err(join_error)) => {
                return Err(LoadError::Unparsable(format!(
                    "Parser task failed: {}",
                    join_error
                )))
            }
            Err(_) => return Err(LoadError::Timeout(self.parse_timeout.as_secs())),
        };

        Ok(self.finish(id, path, title, pages, progress).await)
    }

    /// Apply OCR and assemble the document
    pub(crate) async fn finish(
        &self,
        id: String,
        path: PathBuf,
        title: Option<String>,
        mut pages: Vec<Page>,
        progress: OcrProgress<'_>,
    ) -> LoadOutcome {
        let mut warnings = Vec::new();
        self.apply_ocr(&path, &mut pages, &mut warnings, progress).await;

        let document = Document {
            id,
            title,
            source_path: path,
            pages,
        };

        if document.readable_pages() == 0 {
            warnings.push(
                "This PDF appears to be scanned or contains only images, and no text could be \
                 extracted from it."
                    .to_string(),
            );
        }

        tracing::info!(
            total_pages = document.total_pages(),
            readable_pages = document.readable_pages(),
            ocr_pages = document.ocr_pages(),
            "Completed text extraction"
        );

        LoadOutcome { document, warnings }
    }

    async fn apply_ocr(
        &self,
        path: &Path,
        pages: &mut [Page],
        warnings: &mut Vec<String>,
        progress: OcrProgress<'_>,
    ) {
        let targets: Vec<usize> = match self.ocr_mode {
            OcrMode::Off => return,
            OcrMode::Document => {
                if pages.iter().any(|p| p.text.is_readable()) {
                    return;
                }
                (0..pages.len()).collect()
            }
            OcrMode::Page => pages
                .iter()
                .enumerate()
                .filter(|(_, p)| !p.text.is_readable())
                .map(|(idx, _)| idx)
                .collect(),
        };

        if targets.is_empty() {
            return;
        }

        if !self.ocr.is_available() {
            tracing::warn!(pages = targets.len(), "Pages need OCR but OCR is not available");
            warnings.push(format!(
                "{} page(s) have no text layer and OCR is not available",
                targets.len()
            ));
            return;
        }

        let total = targets.len();
        for (done, idx) in targets.into_iter().enumerate() {
            progress(done, total);
            let page = &mut pages[idx];

            match self.ocr.ocr_page(path, page.number).await {
                Ok(text) => {
                    let text = PageText::from_extracted(&text);
                    if text.is_readable() {
                        page.text = text;
                        page.from_ocr = true;
                    }
                }
                Err(e) => {
                    // One OCR failure disables OCR for the rest of this document
                    tracing::error!(page = page.number, error = %e, "OCR failed, disabling OCR for this document");
                    warnings.push(format!("OCR disabled for this document: {}", e));
                    break;
                }
            }
        }
        progress(total, total);
    }
}

/// Extract every page, substituting the sentinel for page-level failures
pub(crate) fn extract_pages(source: &dyn PageSource) -> (Option<String>, Vec<Page>) {
    let total = source.page_count();
    tracing::info!(total, "Starting text extraction from all pages");

    let pages = (1..=total)
        .map(|number| {
            let text = match source.extract_text(number) {
                Ok(raw) => {
                    let text = PageText::from_extracted(&raw);
                    if !text.is_readable() {
                        tracing::warn!(page = number, "No text found on page");
                    }
                    text
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Page extraction failed");
                    PageText::Unreadable(UnreadableReason::ExtractionFailed)
                }
            };
            Page::new(number, text)
        })
        .collect();

    (source.title(), pages)
}

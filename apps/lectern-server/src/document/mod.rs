//! Document source
//!
//! Opens uploaded PDFs and turns them into an ordered list of pages,
//! each holding either readable text or the unreadable-page sentinel.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lectern_server::document::DocumentLoader;
//!
//! let loader = DocumentLoader::new(ocr, OcrMode::Document, Duration::from_secs(30));
//! let outcome = loader.load(id, path, &|done, total| {}).await?;
//! println!("{} pages", outcome.document.total_pages());
//! ```

mod error;
mod loader;
mod source;
mod types;

pub use error::{ExtractionError, LoadError};
pub use loader::{DocumentLoader, LoadOutcome, OcrProgress};
pub use source::{PageSource, PdfSource};
pub use types::{looks_like_pdf, Document, DocumentSummary, Page, PageText, UnreadableReason};

#[cfg(test)]
pub(crate) use source::fixtures;

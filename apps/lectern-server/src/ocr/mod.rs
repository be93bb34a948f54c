//! OCR Module
//!
//! OCR fallback for scanned PDFs: pages are rasterized with `pdftoppm`
//! and recognized with Tesseract.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lectern_server::ocr::OcrService;
//!
//! let service = OcrService::from_config(&config.ocr);
//! if service.probe().await {
//!     let text = service.ocr_page(&pdf_path, 1).await?;
//! }
//! ```

mod provider;
mod rasterize;
mod service;
mod types;

pub use provider::{OcrProviderTrait, TesseractProvider};
pub use rasterize::{PageRasterizer, PdftoppmRasterizer};
pub use service::OcrService;
pub use types::{OcrError, OcrMode, OcrProvider, OcrResult};

#[cfg(test)]
pub(crate) use provider::MockProvider;
#[cfg(test)]
pub(crate) use rasterize::StubRasterizer;

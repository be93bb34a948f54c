//! Lectern Server Library
//!
//! Reads uploaded PDFs aloud, page by page. The binary in `main.rs`
//! serves the web UI and JSON API built by [`routes::app`].
//!
//! # Modules
//!
//! - `document`: PDF loading and per-page text, with the unreadable-page sentinel
//! - `ocr`: OCR fallback for scanned pages
//! - `speech`: Voice engines and cancellable utterances
//! - `reader`: The reading controller and its read-aloud loop
//! - `session`: Last-session JSON file
//! - `cache`: Upload cache with age/size cleanup

pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod ocr;
pub mod reader;
pub mod retry;
pub mod routes;
pub mod session;
pub mod speech;
pub mod state;

//! Document error types

use thiserror::Error;

/// Failure to open a PDF as a whole
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("PDF file does not exist: {0}")]
    NotFound(String),

    #[error("PDF file is empty")]
    Empty,

    #[error("This PDF is encrypted and requires a password. Please provide an unencrypted PDF file.")]
    Encrypted,

    #[error("PDF file contains no pages")]
    NoPages,

    #[error("Error reading PDF: {0}")]
    Unparsable(String),

    #[error("Parsing the PDF timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to extract the text of one page
///
/// Never fatal: the loader substitutes the unreadable-page sentinel.
#[derive(Debug, Error)]
#[error("Error extracting text from page {page}: {reason}")]
pub struct ExtractionError {
    pub page: usize,
    pub reason: String,
}

impl ExtractionError {
    pub fn new(page: usize, reason: impl Into<String>) -> Self {
        Self {
            page,
            reason: reason.into(),
        }
    }
}

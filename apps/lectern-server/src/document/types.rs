//! Core document types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Why a page has nothing to read aloud
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnreadableReason {
    /// The page has no text layer (or only whitespace)
    NoTextLayer,
    /// Extraction failed for this page
    ExtractionFailed,
}

/// Text of a single page
///
/// `Unreadable` is the "no text" sentinel: the reading loop skips it
/// without treating it as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum PageText {
    Text(String),
    Unreadable(UnreadableReason),
}

impl PageText {
    /// Build from raw extracted text, mapping blank text to the sentinel
    pub fn from_extracted(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self::Unreadable(UnreadableReason::NoTextLayer)
        } else {
            Self::Text(trimmed.to_string())
        }
    }

    pub fn is_readable(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// Text to hand to the voice engine, if any
    pub fn speakable(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Unreadable(_) => None,
        }
    }
}

/// A single page (1-indexed)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub number: usize,
    pub text: PageText,
    /// True when the text came from OCR rather than the text layer
    #[serde(default)]
    pub from_ocr: bool,
}

impl Page {
    pub fn new(number: usize, text: PageText) -> Self {
        Self {
            number,
            text,
            from_ocr: false,
        }
    }

    /// Text shown in the UI; unreadable pages get a bracketed marker
    pub fn display_text(&self) -> String {
        match &self.text {
            PageText::Text(text) => text.clone(),
            PageText::Unreadable(UnreadableReason::NoTextLayer) => {
                format!("[Page {}: No readable text found]", self.number)
            }
            PageText::Unreadable(UnreadableReason::ExtractionFailed) => {
                format!("[Page {}: Error extracting text]", self.number)
            }
        }
    }
}

/// A loaded PDF, fully extracted
#[derive(Debug, Clone)]
pub struct Document {
    /// Content hash of the uploaded file
    pub id: String,
    pub title: Option<String>,
    /// Cached copy of the PDF on disk
    pub source_path: PathBuf,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    /// Page by 1-based number
    pub fn page(&self, number: usize) -> Option<&Page> {
        number.checked_sub(1).and_then(|idx| self.pages.get(idx))
    }

    pub fn readable_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.text.is_readable()).count()
    }

    pub fn ocr_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.from_ocr).count()
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            total_pages: self.total_pages(),
            readable_pages: self.readable_pages(),
            ocr_pages: self.ocr_pages(),
        }
    }
}

/// API view of a loaded document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: String,
    pub title: Option<String>,
    pub total_pages: usize,
    pub readable_pages: usize,
    pub ocr_pages: usize,
}

/// Check the `%PDF` magic bytes
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && bytes.starts_with(b"%PDF")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_text_is_sentinel() {
        assert_eq!(
            PageText::from_extracted("  \n\t "),
            PageText::Unreadable(UnreadableReason::NoTextLayer)
        );
        assert_eq!(
            PageText::from_extracted("  Chapter one \n"),
            PageText::Text("Chapter one".to_string())
        );
    }

    #[test]
    fn test_display_text_markers() {
        let page = Page::new(2, PageText::Unreadable(UnreadableReason::NoTextLayer));
        assert_eq!(page.display_text(), "[Page 2: No readable text found]");

        let page = Page::new(5, PageText::Unreadable(UnreadableReason::ExtractionFailed));
        assert_eq!(page.display_text(), "[Page 5: Error extracting text]");
        assert!(page.text.speakable().is_none());
    }

    #[test]
    fn test_page_lookup_is_one_based() {
        let doc = Document {
            id: "abc".to_string(),
            title: None,
            source_path: PathBuf::from("/tmp/abc.pdf"),
            pages: vec![
                Page::new(1, PageText::Text("one".to_string())),
                Page::new(2, PageText::Unreadable(UnreadableReason::NoTextLayer)),
            ],
        };

        assert!(doc.page(0).is_none());
        assert_eq!(doc.page(1).map(|p| p.number), Some(1));
        assert!(doc.page(3).is_none());
        assert_eq!(doc.readable_pages(), 1);
    }

    #[test]
    fn test_magic_bytes() {
        assert!(looks_like_pdf(b"%PDF-1.7\n"));
        assert!(!looks_like_pdf(b"PK\x03\x04"));
        assert!(!looks_like_pdf(b"%P"));
    }
}

//! PDF text source backed by lopdf

use std::path::Path;

use lopdf::Document as LoDocument;

use super::error::{ExtractionError, LoadError};

/// Page-level access to an opened document
///
/// Page numbers are 1-based.
pub trait PageSource: Send + Sync {
    fn page_count(&self) -> usize;

    /// Title from the document info dictionary, if any
    fn title(&self) -> Option<String>;

    /// Raw text layer of a page (may be blank)
    fn extract_text(&self, page: usize) -> Result<String, ExtractionError>;
}

/// An opened PDF
pub struct PdfSource {
    doc: LoDocument,
    /// lopdf page numbers in document order
    page_numbers: Vec<u32>,
}

impl PdfSource {
    /// Open and validate a PDF file
    pub fn open(path: &Path) -> Result<Self, LoadError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LoadError::NotFound(path.display().to_string())
            } else {
                LoadError::Io(e)
            }
        })?;
        if metadata.len() == 0 {
            return Err(LoadError::Empty);
        }

        let doc = LoDocument::load(path).map_err(classify_lopdf_error)?;
        Self::from_document(doc)
    }

    /// Open a PDF from memory
    #[cfg(test)]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LoadError> {
        if bytes.is_empty() {
            return Err(LoadError::Empty);
        }
        let doc = LoDocument::load_mem(bytes).map_err(classify_lopdf_error)?;
        Self::from_document(doc)
    }

    fn from_document(doc: LoDocument) -> Result<Self, LoadError> {
        if doc.is_encrypted() {
            return Err(LoadError::Encrypted);
        }

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        if page_numbers.is_empty() {
            return Err(LoadError::NoPages);
        }

        Ok(Self { doc, page_numbers })
    }
}

fn classify_lopdf_error(err: lopdf::Error) -> LoadError {
    let message = err.to_string();
    let lowered = message.to_lowercase();
    if lowered.contains("encrypt") || lowered.contains("decrypt") || lowered.contains("password") {
        LoadError::Encrypted
    } else {
        LoadError::Unparsable(message)
    }
}

impl PageSource for PdfSource {
    fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    fn title(&self) -> Option<String> {
        let info_ref = self.doc.trailer.get(b"Info").ok()?.as_reference().ok()?;
        let info = self.doc.get_object(info_ref).ok()?.as_dict().ok()?;
        let raw = info.get(b"Title").ok()?.as_str().ok()?;
        decode_pdf_string(raw).filter(|t| !t.trim().is_empty())
    }

    fn extract_text(&self, page: usize) -> Result<String, ExtractionError> {
        let page_number = page
            .checked_sub(1)
            .and_then(|idx| self.page_numbers.get(idx))
            .ok_or_else(|| {
                ExtractionError::new(
                    page,
                    format!("page out of range (document has {} pages)", self.page_count()),
                )
            })?;

        self.doc
            .extract_text(&[*page_number])
            .map_err(|e| ExtractionError::new(page, e.to_string()))
    }
}

/// Decode a PDF text string (UTF-16BE with BOM, otherwise byte text)
fn decode_pdf_string(bytes: &[u8]) -> Option<String> {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16(&units).ok();
    }
    Some(String::from_utf8_lossy(bytes).into_owned())
}

#[cfg(test)]
#[path = "../../tests/common/mod.rs"]
pub(crate) mod fixtures;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file() {
        let result = PdfSource::open(Path::new("/nonexistent/lectern/test.pdf"));
        assert!(matches!(result, Err(LoadError::NotFound(_))));
    }

    #[test]
    fn test_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.pdf");
        std::fs::write(&path, b"").unwrap();

        assert!(matches!(PdfSource::open(&path), Err(LoadError::Empty)));
    }

    #[test]
    fn test_garbage_is_unparsable() {
        let result = PdfSource::from_bytes(b"definitely not a pdf");
        assert!(matches!(result, Err(LoadError::Unparsable(_))));
    }

    #[test]
    fn test_page_count_and_text() {
        let bytes = fixtures::pdf_with_pages(&["Hello reader", "", "Goodbye"]);
        let source = PdfSource::from_bytes(&bytes).unwrap();

        assert_eq!(source.page_count(), 3);
        assert!(source.extract_text(1).unwrap().contains("Hello reader"));
        assert!(source.extract_text(2).unwrap().trim().is_empty());
        assert!(source.extract_text(4).is_err());
        assert!(source.extract_text(0).is_err());
    }

    #[test]
    fn test_utf16_title_decoding() {
        let bytes = [0xFE, 0xFF, 0x00, b'H', 0x00, b'i'];
        assert_eq!(decode_pdf_string(&bytes).as_deref(), Some("Hi"));
        assert_eq!(decode_pdf_string(b"Plain").as_deref(), Some("Plain"));
    }
}

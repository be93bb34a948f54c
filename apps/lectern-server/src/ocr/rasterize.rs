//! Page rasterization for OCR
//!
//! Renders a single PDF page to PNG with poppler's `pdftoppm`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::types::OcrError;

/// Turns a PDF page into image bytes
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    async fn is_available(&self) -> bool;

    /// Render page `page` (1-based) of `pdf_path` as PNG
    async fn rasterize(&self, pdf_path: &Path, page: usize) -> Result<Vec<u8>, OcrError>;
}

pub struct PdftoppmRasterizer {
    binary: PathBuf,
    dpi: u32,
}

impl PdftoppmRasterizer {
    pub fn new(binary: impl Into<PathBuf>, dpi: u32) -> Self {
        Self {
            binary: binary.into(),
            dpi,
        }
    }
}

#[async_trait]
impl PageRasterizer for PdftoppmRasterizer {
    async fn is_available(&self) -> bool {
        // pdftoppm -v prints its version to stderr and exits 0 on current poppler,
        // 99 on older builds; either way it ran.
        Command::new(&self.binary)
            .arg("-v")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .is_ok()
    }

    async fn rasterize(&self, pdf_path: &Path, page: usize) -> Result<Vec<u8>, OcrError> {
        let prefix = std::env::temp_dir().join(format!("lectern_page_{}", uuid::Uuid::new_v4()));
        let page_arg = page.to_string();

        let output = Command::new(&self.binary)
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-f")
            .arg(&page_arg)
            .arg("-l")
            .arg(&page_arg)
            .arg("-singlefile")
            .arg(pdf_path)
            .arg(&prefix)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| OcrError::RasterizeError {
                page,
                reason: format!("Failed to run pdftoppm: {}", e),
            })?;

        // -singlefile writes exactly `<prefix>.png`
        let image_path = prefix.with_extension("png");

        if !output.status.success() {
            let _ = tokio::fs::remove_file(&image_path).await;
            return Err(OcrError::RasterizeError {
                page,
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let image = tokio::fs::read(&image_path).await;
        let _ = tokio::fs::remove_file(&image_path).await;

        image.map_err(|e| OcrError::RasterizeError {
            page,
            reason: format!("Failed to read rendered page: {}", e),
        })
    }
}

/// Rasterizer returning a fixed byte payload
#[cfg(test)]
pub struct StubRasterizer;

#[cfg(test)]
#[async_trait]
impl PageRasterizer for StubRasterizer {
    async fn is_available(&self) -> bool {
        true
    }

    async fn rasterize(&self, _pdf_path: &Path, page: usize) -> Result<Vec<u8>, OcrError> {
        Ok(format!("page-{}", page).into_bytes())
    }
}

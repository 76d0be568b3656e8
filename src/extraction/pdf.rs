//! PDF extraction backed by the `pdf-extract` crate.

use super::{Extractor, PdfContent};
use crate::error::{LecternError, Result};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, instrument};

/// Extracts plain text from each page of a PDF.
#[derive(Debug, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Extractor for PdfExtractor {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn extract(&self, path: &Path) -> Result<PdfContent> {
        if !tokio::fs::try_exists(path).await? {
            return Err(LecternError::NotFound(format!("PDF not found: {}", path.display())));
        }

        let owned = path.to_path_buf();
        let pages = tokio::task::spawn_blocking(move || pdf_extract::extract_text_by_pages(&owned))
            .await
            .map_err(|e| LecternError::Extraction(format!("Extraction task failed: {}", e)))?
            .map_err(|e| LecternError::Extraction(e.to_string()))?;

        let content = PdfContent::from_pages(pages);
        debug!("Extracted {} non-blank pages", content.pages.len());
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_missing_pdf_is_not_found() {
        let err = PdfExtractor::new()
            .extract(Path::new("/nonexistent/slides.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, LecternError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_garbage_pdf_is_extraction_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"definitely not a pdf").unwrap();

        let err = PdfExtractor::new().extract(file.path()).await.unwrap_err();
        assert!(matches!(err, LecternError::Extraction(_)));
    }
}

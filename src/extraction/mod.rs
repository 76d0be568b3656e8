//! Slide/PDF text extraction.

mod pdf;

pub use pdf::PdfExtractor;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-page information returned alongside the page text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageMetadata {
    /// 1-based page number in the source document.
    pub page_number: u32,
    /// Number of characters extracted from the page.
    pub char_count: usize,
}

/// Text content of a PDF, one entry per non-blank page.
///
/// `pages` and `metadata` always have the same length.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PdfContent {
    pub pages: Vec<String>,
    pub metadata: Vec<PageMetadata>,
}

impl PdfContent {
    /// Build content from raw page texts, dropping blank pages but keeping
    /// the original page numbers.
    pub fn from_pages<I, S>(raw_pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut content = PdfContent::default();

        for (idx, raw) in raw_pages.into_iter().enumerate() {
            let text = raw.as_ref().trim();
            if text.is_empty() {
                continue;
            }
            content.metadata.push(PageMetadata {
                page_number: idx as u32 + 1,
                char_count: text.chars().count(),
            });
            content.pages.push(text.to_string());
        }

        content
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Trait for document text extraction.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract per-page text from the document at `path`.
    async fn extract(&self, path: &Path) -> Result<PdfContent>;
}

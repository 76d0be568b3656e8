//! Test doubles shared across module tests.

use crate::embedding::Embedder;
use crate::error::{LecternError, Result};
use crate::extraction::{Extractor, PdfContent};
use crate::transcription::{Transcriber, Transcript, TranscriptSegment};
use crate::vector_store::{
    Entry, MemoryVectorStore, Metadata, QueryRequest, QueryResult, VectorStore,
};
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Bag-of-words embedder: texts sharing words land close together.
pub struct KeywordEmbedder {
    dims: usize,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self { dims: 64 }
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0; self.dims];
        for word in text.split_whitespace() {
            let word = word.to_lowercase();
            let bucket = word
                .bytes()
                .fold(7usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
            vector[bucket % self.dims] += 1.0;
        }
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// Transcriber returning a fixed set of segments, or failing.
pub struct ScriptedTranscriber {
    segments: Option<Vec<TranscriptSegment>>,
}

impl ScriptedTranscriber {
    pub fn with_segments(segments: Vec<TranscriptSegment>) -> Self {
        Self { segments: Some(segments) }
    }

    pub fn failing() -> Self {
        Self { segments: None }
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, video_path: &Path) -> Result<Transcript> {
        match &self.segments {
            Some(segments) => Ok(Transcript::new(
                crate::transcription::file_name(video_path),
                segments.clone(),
            )),
            None => Err(LecternError::Transcription("scripted failure".to_string())),
        }
    }
}

/// Extractor returning fixed pages, or failing.
pub struct ScriptedExtractor {
    pages: Option<Vec<String>>,
}

impl ScriptedExtractor {
    pub fn with_pages(pages: &[&str]) -> Self {
        Self {
            pages: Some(pages.iter().map(|p| p.to_string()).collect()),
        }
    }

    pub fn failing() -> Self {
        Self { pages: None }
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn extract(&self, _path: &Path) -> Result<PdfContent> {
        match &self.pages {
            Some(pages) => Ok(PdfContent::from_pages(pages)),
            None => Err(LecternError::Extraction("scripted failure".to_string())),
        }
    }
}

/// Vector store that rejects every write and counts attempts.
#[derive(Default)]
pub struct RejectingVectorStore {
    pub upsert_calls: AtomicUsize,
}

#[async_trait]
impl VectorStore for RejectingVectorStore {
    async fn upsert(
        &self,
        _ids: &[String],
        _documents: &[String],
        _metadatas: &[Metadata],
    ) -> Result<usize> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        Err(LecternError::VectorStore("store unavailable".to_string()))
    }

    async fn query(&self, _request: &QueryRequest) -> Result<QueryResult> {
        Err(LecternError::VectorStore("store unavailable".to_string()))
    }

    async fn get(&self, _where_filter: Option<&Metadata>) -> Result<Vec<Entry>> {
        Ok(Vec::new())
    }

    async fn count(&self) -> Result<usize> {
        Ok(0)
    }
}

/// In-memory store that rejects batches containing one entry `type`.
pub struct TypeRejectingVectorStore {
    inner: MemoryVectorStore,
    rejected_type: &'static str,
}

impl TypeRejectingVectorStore {
    pub fn new(embedder: Arc<dyn Embedder>, rejected_type: &'static str) -> Self {
        Self {
            inner: MemoryVectorStore::new(embedder),
            rejected_type,
        }
    }
}

#[async_trait]
impl VectorStore for TypeRejectingVectorStore {
    async fn upsert(
        &self,
        ids: &[String],
        documents: &[String],
        metadatas: &[Metadata],
    ) -> Result<usize> {
        let rejected = metadatas
            .iter()
            .any(|m| m.get("type").and_then(|t| t.as_str()) == Some(self.rejected_type));
        if rejected {
            return Err(LecternError::VectorStore(format!(
                "{} writes rejected",
                self.rejected_type
            )));
        }
        self.inner.upsert(ids, documents, metadatas).await
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResult> {
        self.inner.query(request).await
    }

    async fn get(&self, where_filter: Option<&Metadata>) -> Result<Vec<Entry>> {
        self.inner.get(where_filter).await
    }

    async fn count(&self) -> Result<usize> {
        self.inner.count().await
    }
}

//! Vector store abstraction for Lectern.
//!
//! A store holds one named collection of `(id, document, metadata)` entries.
//! Embeddings are computed by the store implementation itself, so callers
//! deal only in text. Retrieval is filtered by metadata equality, which is
//! how per-course isolation is enforced.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::config::{Settings, VectorStoreProvider};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{LecternError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Metadata attached to a vector entry.
pub type Metadata = serde_json::Map<String, Value>;

/// Optional fields to return from a query. Ids are always returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Include {
    Documents,
    Metadatas,
    Distances,
}

/// A similarity query against the collection.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// One result list is produced per query text.
    pub query_texts: Vec<String>,
    /// Maximum results per query text.
    pub n_results: usize,
    pub include: Vec<Include>,
    /// Every key/value pair must equal the entry's metadata value.
    pub where_filter: Option<Metadata>,
}

/// Query results, nested per query text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    pub ids: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadatas: Option<Vec<Vec<Metadata>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distances: Option<Vec<Vec<f32>>>,
}

/// A stored entry, without its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    pub id: String,
    pub document: String,
    pub metadata: Metadata,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert entries, overwriting any existing entry with the same id.
    async fn upsert(&self, ids: &[String], documents: &[String], metadatas: &[Metadata]) -> Result<usize>;

    /// Similarity search with an optional metadata equality filter.
    async fn query(&self, request: &QueryRequest) -> Result<QueryResult>;

    /// Fetch entries matching the filter, ordered by id.
    async fn get(&self, where_filter: Option<&Metadata>) -> Result<Vec<Entry>>;

    /// Total number of entries in the collection.
    async fn count(&self) -> Result<usize>;
}

/// Build the vector store selected in settings, with an OpenAI embedder.
pub fn create_vector_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::from_settings(settings));

    let store: Arc<dyn VectorStore> = match settings.vector_store.provider {
        VectorStoreProvider::Sqlite => Arc::new(SqliteVectorStore::open(
            &settings.vector_store_path(),
            &settings.vector_store.collection,
            embedder,
        )?),
        VectorStoreProvider::Memory => Arc::new(MemoryVectorStore::new(embedder)),
    };

    Ok(store)
}

/// Reject batches whose parallel slices disagree in length.
pub(crate) fn validate_batch(ids: &[String], documents: &[String], metadatas: &[Metadata]) -> Result<()> {
    if ids.len() != documents.len() || ids.len() != metadatas.len() {
        return Err(LecternError::InvalidInput(format!(
            "Mismatched upsert batch: {} ids, {} documents, {} metadatas",
            ids.len(),
            documents.len(),
            metadatas.len()
        )));
    }
    Ok(())
}

/// Reject embedder output that does not cover every document.
pub(crate) fn check_embedding_count(expected: usize, embeddings: &[Vec<f32>]) -> Result<()> {
    if embeddings.len() != expected {
        return Err(LecternError::Embedding(format!(
            "Expected {} embeddings, got {}",
            expected,
            embeddings.len()
        )));
    }
    Ok(())
}

/// Whether `metadata` satisfies every equality in `filter`.
pub fn metadata_matches(metadata: &Metadata, filter: Option<&Metadata>) -> bool {
    match filter {
        None => true,
        Some(filter) => filter
            .iter()
            .all(|(key, expected)| metadata.get(key) == Some(expected)),
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Rank candidates against each query embedding and shape the result.
///
/// Distance is reported as `1 - cosine similarity`, so lower is closer.
pub(crate) fn rank_candidates(
    query_embeddings: &[Vec<f32>],
    candidates: &[(Entry, Vec<f32>)],
    n_results: usize,
    include: &[Include],
) -> QueryResult {
    let mut result = QueryResult {
        ids: Vec::with_capacity(query_embeddings.len()),
        documents: include.contains(&Include::Documents).then(Vec::new),
        metadatas: include.contains(&Include::Metadatas).then(Vec::new),
        distances: include.contains(&Include::Distances).then(Vec::new),
    };

    for query in query_embeddings {
        let mut scored: Vec<(&Entry, f32)> = candidates
            .iter()
            .map(|(entry, embedding)| (entry, 1.0 - cosine_similarity(query, embedding)))
            .collect();

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(n_results);

        result.ids.push(scored.iter().map(|(e, _)| e.id.clone()).collect());
        if let Some(documents) = result.documents.as_mut() {
            documents.push(scored.iter().map(|(e, _)| e.document.clone()).collect());
        }
        if let Some(metadatas) = result.metadatas.as_mut() {
            metadatas.push(scored.iter().map(|(e, _)| e.metadata.clone()).collect());
        }
        if let Some(distances) = result.distances.as_mut() {
            distances.push(scored.iter().map(|(_, d)| *d).collect());
        }
    }

    result
}

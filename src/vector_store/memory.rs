//! In-memory vector store implementation.
//!
//! Useful for testing and ephemeral runs.

use super::{
    check_embedding_count, metadata_matches, rank_candidates, validate_batch, Entry, Metadata,
    QueryRequest, QueryResult, VectorStore,
};
use crate::embedding::Embedder;
use crate::error::{LecternError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// In-memory vector store.
pub struct MemoryVectorStore {
    embedder: Arc<dyn Embedder>,
    entries: RwLock<BTreeMap<String, (Entry, Vec<f32>)>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    fn lock_error<E: std::fmt::Display>(e: E) -> LecternError {
        LecternError::VectorStore(format!("Failed to acquire lock: {}", e))
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, ids: &[String], documents: &[String], metadatas: &[Metadata]) -> Result<usize> {
        validate_batch(ids, documents, metadatas)?;
        if ids.is_empty() {
            return Ok(0);
        }

        let embeddings = self.embedder.embed_batch(documents).await?;
        check_embedding_count(ids.len(), &embeddings)?;

        let mut entries = self.entries.write().map_err(Self::lock_error)?;
        for ((id, document), (metadata, embedding)) in ids
            .iter()
            .zip(documents)
            .zip(metadatas.iter().zip(embeddings))
        {
            let entry = Entry {
                id: id.clone(),
                document: document.clone(),
                metadata: metadata.clone(),
            };
            entries.insert(id.clone(), (entry, embedding));
        }

        Ok(ids.len())
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResult> {
        let query_embeddings = self.embedder.embed_batch(&request.query_texts).await?;

        let entries = self.entries.read().map_err(Self::lock_error)?;
        let candidates: Vec<(Entry, Vec<f32>)> = entries
            .values()
            .filter(|(entry, _)| metadata_matches(&entry.metadata, request.where_filter.as_ref()))
            .cloned()
            .collect();

        Ok(rank_candidates(
            &query_embeddings,
            &candidates,
            request.n_results,
            &request.include,
        ))
    }

    async fn get(&self, where_filter: Option<&Metadata>) -> Result<Vec<Entry>> {
        let entries = self.entries.read().map_err(Self::lock_error)?;
        Ok(entries
            .values()
            .filter(|(entry, _)| metadata_matches(&entry.metadata, where_filter))
            .map(|(entry, _)| entry.clone())
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        let entries = self.entries.read().map_err(Self::lock_error)?;
        Ok(entries.len())
    }
}

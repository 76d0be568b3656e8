//! Course-scoped ingestion, retrieval and persona templating.

use crate::error::Result;
use crate::vector_store::{Include, Metadata, QueryRequest, VectorStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Number of entries retrieved per question.
pub const DEFAULT_TOP_K: usize = 3;

/// Characters of the first sample text embedded in a persona prompt.
pub const PERSONA_SAMPLE_CHARS: usize = 500;

/// Answer returned until an answer-synthesis model is wired in.
pub const PLACEHOLDER_ANSWER: &str = "LLM synthesis placeholder. Connect an answer model to generate responses.";

/// Outcome of an ingestion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResult {
    pub ingested: usize,
}

/// Retrieval output for a single question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub question: String,
    /// Nested per query text, as returned by the store.
    pub documents: Vec<Vec<String>>,
    pub ids: Vec<Vec<String>>,
    pub metadatas: Vec<Vec<Metadata>>,
    pub answer: String,
}

impl QueryResponse {
    /// Documents retrieved for the question, flattened.
    pub fn sources(&self) -> Vec<String> {
        self.documents.iter().flatten().cloned().collect()
    }
}

/// Metadata filter selecting a single course.
pub fn course_filter(course_id: &str) -> Metadata {
    let mut filter = Metadata::new();
    filter.insert("course_id".to_string(), Value::String(course_id.to_string()));
    filter
}

/// Build the persona prompt for a course from sample texts.
///
/// Only the first sample is used, truncated to [`PERSONA_SAMPLE_CHARS`] characters.
pub fn generate_persona_prompt(course_id: &str, sample_texts: &[String]) -> String {
    let sample: String = sample_texts
        .first()
        .map(|s| s.chars().take(PERSONA_SAMPLE_CHARS).collect())
        .unwrap_or_default();

    format!(
        "You are an AI that imitates the speaking style of the instructor of course_id={}. \
         Refer to the sample below when answering:\n{}",
        course_id, sample
    )
}

/// Ingestion and retrieval over a vector store, scoped by course.
pub struct RagPipeline {
    store: Arc<dyn VectorStore>,
    top_k: usize,
}

impl RagPipeline {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self {
            store,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn store(&self) -> Arc<dyn VectorStore> {
        self.store.clone()
    }

    /// Ingest `texts` for `course_id` with ids `{course_id}-doc-{i}` starting at 0.
    pub async fn ingest_texts(
        &self,
        texts: &[String],
        course_id: &str,
        metadata: Option<&Metadata>,
    ) -> Result<IngestResult> {
        self.ingest_texts_at(texts, course_id, metadata, 0).await
    }

    /// Ingest `texts` with positional ids starting at `start`.
    ///
    /// The stored `course_id` always equals `course_id`, whatever the
    /// caller-supplied metadata says.
    #[instrument(skip(self, texts, metadata), fields(count = texts.len()))]
    pub async fn ingest_texts_at(
        &self,
        texts: &[String],
        course_id: &str,
        metadata: Option<&Metadata>,
        start: usize,
    ) -> Result<IngestResult> {
        if texts.is_empty() {
            return Ok(IngestResult { ingested: 0 });
        }

        let mut merged = metadata.cloned().unwrap_or_default();
        merged.insert("course_id".to_string(), Value::String(course_id.to_string()));

        let ids: Vec<String> = (start..start + texts.len())
            .map(|i| format!("{}-doc-{}", course_id, i))
            .collect();
        let metadatas = vec![merged; texts.len()];

        let ingested = self.store.upsert(&ids, texts, &metadatas).await?;
        debug!("Ingested {} texts for course {}", ingested, course_id);

        Ok(IngestResult { ingested })
    }

    /// Retrieve the closest entries for `question` within `course_id`.
    #[instrument(skip(self))]
    pub async fn query(&self, question: &str, course_id: &str) -> Result<QueryResponse> {
        let result = self
            .store
            .query(&QueryRequest {
                query_texts: vec![question.to_string()],
                n_results: self.top_k,
                include: vec![Include::Documents, Include::Metadatas],
                where_filter: Some(course_filter(course_id)),
            })
            .await?;

        Ok(QueryResponse {
            question: question.to_string(),
            documents: result.documents.unwrap_or_default(),
            ids: result.ids,
            metadatas: result.metadatas.unwrap_or_default(),
            answer: PLACEHOLDER_ANSWER.to_string(),
        })
    }

    pub fn generate_persona_prompt(&self, course_id: &str, sample_texts: &[String]) -> String {
        generate_persona_prompt(course_id, sample_texts)
    }
}

//! OpenAI embeddings for course documents.

use super::Embedder;
use crate::config::Settings;
use crate::error::{LecternError, Result};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_openai::Client;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Maximum inputs per embeddings request.
const MAX_BATCH: usize = 100;

/// Embedder backed by the OpenAI embeddings endpoint.
pub struct OpenAIEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    pub fn new(model: impl Into<String>, dimensions: usize, api_key: Option<&str>) -> Self {
        Self {
            client: create_client(api_key),
            model: model.into(),
            dimensions,
        }
    }

    /// Embedder for the model and key configured in settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.embedding.model.clone(),
            settings.embedding.dimensions as usize,
            settings.llm.openai_api_key.as_deref(),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn embed_request(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let expected = inputs.len();
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(inputs))
            .dimensions(self.dimensions as u32)
            .build()
            .map_err(|e| LecternError::Embedding(format!("Invalid embeddings request: {}", e)))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| LecternError::OpenAI(format!("Embeddings request failed: {}", e)))?;

        let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
        for item in response.data {
            let slot = slots.get_mut(item.index as usize).ok_or_else(|| {
                LecternError::Embedding(format!("Embedding index {} out of range", item.index))
            })?;
            *slot = Some(item.embedding);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.ok_or_else(|| LecternError::Embedding(format!("Missing embedding for input {}", i)))
            })
            .collect()
    }
}

/// Prepare request inputs: blank documents become a single space, which the
/// endpoint accepts, and the list is split into request-sized batches.
fn request_batches(texts: &[String]) -> Vec<Vec<String>> {
    texts
        .chunks(MAX_BATCH)
        .map(|chunk| {
            chunk
                .iter()
                .map(|t| if t.trim().is_empty() { " ".to_string() } else { t.clone() })
                .collect()
        })
        .collect()
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| LecternError::Embedding("No embedding returned".to_string()))
    }

    #[instrument(skip(self, texts), fields(model = %self.model, count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in request_batches(texts) {
            embeddings.extend(self.embed_request(batch).await?);
        }

        debug!("Embedded {} documents", embeddings.len());
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

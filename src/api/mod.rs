//! HTTP API: upload, status and chat endpoints over the processing core.

mod error;
mod routes;

pub use error::ApiError;
pub use routes::{router, ChatRequest, ChatResponse, StatusResponse, UploadResponse};

use crate::config::Settings;
use crate::db::CourseStore;
use crate::error::Result;
use crate::extraction::PdfExtractor;
use crate::processing::CourseProcessor;
use crate::rag::RagPipeline;
use crate::storage::AssetStore;
use crate::transcription::create_transcriber;
use crate::vector_store::create_vector_store;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub store: Arc<CourseStore>,
    pub assets: AssetStore,
    pub pipeline: Arc<RagPipeline>,
    pub processor: Arc<CourseProcessor>,
}

impl AppState {
    /// Wire up the stores and services described by `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let store = Arc::new(CourseStore::open(&settings.database_path())?);
        let pipeline = Arc::new(RagPipeline::new(create_vector_store(settings)?));
        let processor = Arc::new(CourseProcessor::new(
            store.clone(),
            pipeline.clone(),
            create_transcriber(settings),
            Arc::new(PdfExtractor::new()),
        ));

        Ok(Self {
            store,
            assets: AssetStore::new(settings.uploads_dir()),
            pipeline,
            processor,
        })
    }
}

//! Transcription module for Lectern.
//!
//! Turns an uploaded lecture video into transcript text with timestamped segments.

mod models;
mod placeholder;
mod whisper;

pub use models::{Transcript, TranscriptSegment};
pub use placeholder::PlaceholderTranscriber;
pub use whisper::WhisperTranscriber;

use crate::config::{Settings, TranscriptionProvider};
use crate::error::{LecternError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a video file and return segments with timestamps.
    async fn transcribe(&self, video_path: &Path) -> Result<Transcript>;
}

/// Build the transcriber selected in settings.
pub fn create_transcriber(settings: &Settings) -> Arc<dyn Transcriber> {
    match settings.transcription.provider {
        TranscriptionProvider::Whisper => Arc::new(WhisperTranscriber::with_config(
            &settings.transcription.model,
            settings.transcription.language.clone(),
            settings.llm.openai_api_key.as_deref(),
        )),
        TranscriptionProvider::Placeholder => Arc::new(PlaceholderTranscriber),
    }
}

/// Fail with `NotFound` unless `path` names an existing file.
pub(crate) async fn ensure_exists(path: &Path) -> Result<()> {
    if tokio::fs::try_exists(path).await? {
        Ok(())
    } else {
        Err(LecternError::NotFound(format!("Video not found: {}", path.display())))
    }
}

/// File name component of a path, for display and metadata.
pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

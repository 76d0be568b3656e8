//! Offline transcriber returning a fixed transcript.

use super::{ensure_exists, file_name, Transcriber, Transcript, TranscriptSegment};
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use tracing::warn;

const PLACEHOLDER_TEXT: &str = "Transcription placeholder. Configure the whisper provider for real transcripts.";

/// Transcriber that never calls out; useful for local runs without API keys.
pub struct PlaceholderTranscriber;

#[async_trait]
impl Transcriber for PlaceholderTranscriber {
    async fn transcribe(&self, video_path: &Path) -> Result<Transcript> {
        ensure_exists(video_path).await?;
        warn!("Using placeholder transcription for {}", video_path.display());

        Ok(Transcript::new(
            file_name(video_path),
            vec![TranscriptSegment::new(0.0, 0.0, PLACEHOLDER_TEXT)],
        ))
    }
}

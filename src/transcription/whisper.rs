//! OpenAI Whisper transcription implementation.

use super::{ensure_exists, file_name, Transcriber, Transcript, TranscriptSegment};
use crate::error::{LecternError, Result};
use crate::openai::create_client;
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info, instrument};

/// OpenAI Whisper-based transcriber.
pub struct WhisperTranscriber {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    language: Option<String>,
}

impl WhisperTranscriber {
    /// Create a new Whisper transcriber with default settings.
    pub fn new() -> Self {
        Self::with_config("whisper-1", None, None)
    }

    /// Create a new Whisper transcriber with custom configuration.
    pub fn with_config(model: &str, language: Option<String>, api_key: Option<&str>) -> Self {
        Self {
            client: create_client(api_key),
            model: model.to_string(),
            language,
        }
    }
}

impl Default for WhisperTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    #[instrument(skip(self), fields(video_path = %video_path.display()))]
    async fn transcribe(&self, video_path: &Path) -> Result<Transcript> {
        ensure_exists(video_path).await?;

        let name = file_name(video_path);
        let file_bytes = tokio::fs::read(video_path).await?;
        debug!("Uploading {} bytes for transcription", file_bytes.len());

        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(AudioInput::from_vec_u8(name.clone(), file_bytes))
            .model(&self.model)
            .response_format(AudioResponseFormat::VerboseJson);

        if let Some(lang) = &self.language {
            request_builder.language(lang);
        }

        let request = request_builder
            .build()
            .map_err(|e| LecternError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe_verbose_json(request)
            .await
            .map_err(|e| LecternError::OpenAI(format!("Whisper API error: {}", e)))?;

        let segments: Vec<TranscriptSegment> = response
            .segments
            .map(|segs| {
                segs.iter()
                    .map(|s| TranscriptSegment::new(s.start as f64, s.end as f64, s.text.trim()))
                    .collect()
            })
            .unwrap_or_else(|| {
                // Fallback: create single segment from full text
                vec![TranscriptSegment::new(
                    0.0,
                    response.duration as f64,
                    response.text.trim(),
                )]
            });

        info!("Transcribed {} into {} segments", name, segments.len());
        Ok(Transcript::new(name, segments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_video_fails_before_api_call() {
        let transcriber = WhisperTranscriber::with_config("whisper-1", None, Some("sk-unused"));
        let err = transcriber
            .transcribe(Path::new("/nonexistent/week1.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, LecternError::NotFound(_)));
    }
}

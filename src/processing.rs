//! Background processing of uploaded course assets.
//!
//! A job runs: mark the course `processing` → transcribe the video and ingest
//! each non-empty segment → extract the PDF and ingest each page → record the
//! asset rows → derive and ingest a persona prompt → mark `completed`.
//!
//! A failure anywhere in the PDF step is logged and skipped. Any other failure marks the
//! course `failed`. If that status write fails as well the outcome says so
//! rather than being swallowed.
//!
//! Store handles are taken per write and never held across a transcription,
//! extraction or vector-store call.

use crate::db::{AssetKind, CourseStatus, CourseStore, NewAsset};
use crate::error::Result;
use crate::extraction::Extractor;
use crate::rag::RagPipeline;
use crate::storage::StoredFile;
use crate::transcription::Transcriber;
use crate::vector_store::Metadata;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

/// Inputs for one processing run.
#[derive(Debug, Clone)]
pub struct ProcessingJob {
    pub course_id: String,
    pub instructor_id: String,
    pub video: Option<StoredFile>,
    pub pdf: Option<StoredFile>,
}

/// What a successful run ingested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingSummary {
    pub segments_ingested: usize,
    pub pages_ingested: usize,
    pub persona_ingested: bool,
    pub assets_recorded: usize,
    /// Set when PDF extraction failed and was skipped.
    pub pdf_error: Option<String>,
}

/// Result of a processing run, as seen by operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed(ProcessingSummary),
    /// The run failed and the course was marked `failed`.
    Failed { error: String },
    /// The run failed and marking the course `failed` also failed, so the
    /// stored status still reads whatever was last written.
    FailedUnrecorded { error: String, status_error: String },
}

impl TaskOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed(_))
    }
}

/// Runs processing jobs against the stores and external services.
pub struct CourseProcessor {
    store: Arc<CourseStore>,
    pipeline: Arc<RagPipeline>,
    transcriber: Arc<dyn Transcriber>,
    extractor: Arc<dyn Extractor>,
}

impl CourseProcessor {
    pub fn new(
        store: Arc<CourseStore>,
        pipeline: Arc<RagPipeline>,
        transcriber: Arc<dyn Transcriber>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        Self {
            store,
            pipeline,
            transcriber,
            extractor,
        }
    }

    /// Schedule `job` on the runtime and log its outcome when it finishes.
    pub fn spawn(self: &Arc<Self>, job: ProcessingJob) -> JoinHandle<TaskOutcome> {
        let processor = Arc::clone(self);
        tokio::spawn(async move { processor.run(job).await })
    }

    /// Run a job to a terminal outcome.
    #[instrument(skip(self, job), fields(course_id = %job.course_id))]
    pub async fn run(&self, job: ProcessingJob) -> TaskOutcome {
        let outcome = match self.process(&job).await {
            Ok(summary) => TaskOutcome::Completed(summary),
            Err(e) => {
                error!(course_id = %job.course_id, "Processing failed: {:?}", e);
                match self.store.set_status(&job.course_id, CourseStatus::Failed) {
                    Ok(_) => TaskOutcome::Failed { error: e.to_string() },
                    Err(status_err) => TaskOutcome::FailedUnrecorded {
                        error: e.to_string(),
                        status_error: status_err.to_string(),
                    },
                }
            }
        };

        report(&job.course_id, &outcome);
        outcome
    }

    async fn process(&self, job: &ProcessingJob) -> Result<ProcessingSummary> {
        let course_id = job.course_id.as_str();
        self.store.begin_processing(course_id, &job.instructor_id)?;

        let mut summary = ProcessingSummary::default();
        let mut samples: Vec<String> = Vec::new();
        let mut assets: Vec<NewAsset> = Vec::new();
        // Next positional id for this run; shared so entries never overwrite each other.
        let mut position = 0usize;

        if let Some(video) = &job.video {
            info!(course_id, "Transcribing {}", video.filename);
            let transcript = self.transcriber.transcribe(&video.path).await?;

            if !transcript.full_text.is_empty() {
                info!(course_id, "Ingesting {} segments", transcript.segments.len());
                for (idx, segment) in transcript.segments.iter().enumerate() {
                    if segment.is_empty() {
                        continue;
                    }
                    let metadata = base_metadata(
                        job,
                        &video.filename,
                        [
                            ("start_time", json!(segment.start_seconds)),
                            ("end_time", json!(segment.end_seconds)),
                            ("segment_index", json!(idx)),
                        ],
                    );
                    let ingested = self
                        .ingest_one(&segment.text, course_id, &metadata, &mut position)
                        .await?;
                    summary.segments_ingested += ingested;
                }
                samples.push(transcript.full_text.clone());
            }

            assets.push(new_asset(job, video, AssetKind::Video));
        }

        if let Some(pdf) = &job.pdf {
            match self.ingest_pdf(job, pdf, &mut samples, &mut position).await {
                Ok(count) => summary.pages_ingested = count,
                Err(e) => {
                    warn!(course_id, "PDF processing failed for {}: {}", pdf.filename, e);
                    summary.pdf_error = Some(e.to_string());
                }
            }

            assets.push(new_asset(job, pdf, AssetKind::Pdf));
        }

        summary.assets_recorded = self.store.record_assets(&assets)?;

        if !samples.is_empty() {
            let persona = self.pipeline.generate_persona_prompt(course_id, &samples);
            let mut metadata = Metadata::new();
            metadata.insert("instructor_id".to_string(), json!(job.instructor_id));
            metadata.insert("type".to_string(), json!("persona"));

            let ingested = self.ingest_one(&persona, course_id, &metadata, &mut position).await?;
            summary.persona_ingested = ingested > 0;
            info!(course_id, "Persona prompt ingested");
        }

        self.store.set_status(course_id, CourseStatus::Completed)?;
        Ok(summary)
    }

    /// Extract the PDF and ingest its pages. Any error here is confined to the PDF.
    ///
    /// Extracted pages join the persona samples before ingestion starts.
    async fn ingest_pdf(
        &self,
        job: &ProcessingJob,
        pdf: &StoredFile,
        samples: &mut Vec<String>,
        position: &mut usize,
    ) -> Result<usize> {
        let course_id = job.course_id.as_str();
        info!(course_id, "Extracting {}", pdf.filename);

        let content = self.extractor.extract(&pdf.path).await?;
        if content.is_empty() {
            warn!(course_id, "No text extracted from {}", pdf.filename);
            return Ok(0);
        }
        samples.extend(content.pages.iter().cloned());

        info!(course_id, "Ingesting {} PDF pages", content.pages.len());
        let mut ingested = 0;
        for (text, page) in content.pages.iter().zip(&content.metadata) {
            let metadata = base_metadata(
                job,
                &pdf.filename,
                [
                    ("page_number", json!(page.page_number)),
                    ("type", json!("pdf_page")),
                ],
            );
            ingested += self.ingest_one(text, course_id, &metadata, position).await?;
        }
        Ok(ingested)
    }

    async fn ingest_one(
        &self,
        text: &str,
        course_id: &str,
        metadata: &Metadata,
        position: &mut usize,
    ) -> Result<usize> {
        let result = self
            .pipeline
            .ingest_texts_at(&[text.to_string()], course_id, Some(metadata), *position)
            .await?;
        *position += result.ingested;
        Ok(result.ingested)
    }
}

fn new_asset(job: &ProcessingJob, file: &StoredFile, kind: AssetKind) -> NewAsset {
    NewAsset {
        course_id: job.course_id.clone(),
        filename: file.filename.clone(),
        storage_path: file.path.display().to_string(),
        filetype: kind,
    }
}

fn base_metadata<const N: usize>(
    job: &ProcessingJob,
    source: &str,
    extra: [(&str, Value); N],
) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("course_id".to_string(), json!(job.course_id));
    metadata.insert("instructor_id".to_string(), json!(job.instructor_id));
    metadata.insert("source".to_string(), json!(source));
    for (key, value) in extra {
        metadata.insert(key.to_string(), value);
    }
    metadata
}

fn report(course_id: &str, outcome: &TaskOutcome) {
    match outcome {
        TaskOutcome::Completed(summary) => info!(
            course_id,
            segments = summary.segments_ingested,
            pages = summary.pages_ingested,
            persona = summary.persona_ingested,
            "Processing completed"
        ),
        TaskOutcome::Failed { error } => {
            error!(course_id, %error, "Processing failed; course marked failed")
        }
        TaskOutcome::FailedUnrecorded { error, status_error } => error!(
            course_id,
            %error,
            %status_error,
            "Processing failed and the failed status could not be recorded"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::course_filter;
    use crate::testing::{
        KeywordEmbedder, RejectingVectorStore, ScriptedExtractor, ScriptedTranscriber,
        TypeRejectingVectorStore,
    };
    use crate::transcription::TranscriptSegment;
    use crate::vector_store::{MemoryVectorStore, VectorStore};
    use std::path::PathBuf;

    struct Harness {
        store: Arc<CourseStore>,
        vectors: Arc<dyn VectorStore>,
        processor: Arc<CourseProcessor>,
    }

    fn harness(transcriber: ScriptedTranscriber, extractor: ScriptedExtractor) -> Harness {
        harness_with_store(
            transcriber,
            extractor,
            Arc::new(MemoryVectorStore::new(Arc::new(KeywordEmbedder::new()))),
        )
    }

    fn harness_with_store(
        transcriber: ScriptedTranscriber,
        extractor: ScriptedExtractor,
        vectors: Arc<dyn VectorStore>,
    ) -> Harness {
        let store = Arc::new(CourseStore::in_memory().unwrap());
        let processor = Arc::new(CourseProcessor::new(
            store.clone(),
            Arc::new(RagPipeline::new(vectors.clone())),
            Arc::new(transcriber),
            Arc::new(extractor),
        ));
        Harness {
            store,
            vectors,
            processor,
        }
    }

    fn job(course_id: &str, video: Option<&str>, pdf: Option<&str>) -> ProcessingJob {
        ProcessingJob {
            course_id: course_id.to_string(),
            instructor_id: "inst-1".to_string(),
            video: video.map(StoredFile::local),
            pdf: pdf.map(StoredFile::local),
        }
    }

    fn typed(course_id: &str, kind: &str) -> Metadata {
        let mut filter = course_filter(course_id);
        filter.insert("type".to_string(), json!(kind));
        filter
    }

    #[tokio::test]
    async fn test_video_only_skips_empty_segments() {
        let h = harness(
            ScriptedTranscriber::with_segments(vec![
                TranscriptSegment::new(0.0, 1.0, "hello"),
                TranscriptSegment::new(1.0, 2.0, ""),
            ]),
            ScriptedExtractor::failing(),
        );

        let outcome = h
            .processor
            .run(job("c42", Some("/uploads/inst-1/c42/intro.mp4"), None))
            .await;

        assert_eq!(
            outcome,
            TaskOutcome::Completed(ProcessingSummary {
                segments_ingested: 1,
                pages_ingested: 0,
                persona_ingested: true,
                assets_recorded: 1,
                pdf_error: None,
            })
        );
        assert_eq!(h.store.get_course("c42").unwrap().unwrap().status, CourseStatus::Completed);

        let assets = h.store.list_assets("c42").unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].filetype, AssetKind::Video);
        assert_eq!(assets[0].filename, "intro.mp4");

        let entries = h.vectors.get(Some(&course_filter("c42"))).await.unwrap();
        assert_eq!(entries.len(), 2);

        let segment = entries.iter().find(|e| e.document == "hello").unwrap();
        assert_eq!(segment.metadata["segment_index"], 0);
        assert_eq!(segment.metadata["source"], "intro.mp4");
        assert_eq!(segment.metadata["start_time"], 0.0);
        assert_eq!(segment.metadata["end_time"], 1.0);

        let persona = h.vectors.get(Some(&typed("c42", "persona"))).await.unwrap();
        assert_eq!(persona.len(), 1);
        assert!(persona[0].document.contains("course_id=c42"));
        assert!(persona[0].document.ends_with("hello"));
    }

    #[tokio::test]
    async fn test_pdf_extraction_failure_still_completes() {
        let h = harness(ScriptedTranscriber::failing(), ScriptedExtractor::failing());

        let outcome = h.processor.run(job("c1", None, Some("/uploads/inst-1/c1/deck.pdf"))).await;

        match outcome {
            TaskOutcome::Completed(summary) => {
                assert_eq!(summary.pages_ingested, 0);
                assert!(!summary.persona_ingested);
                assert!(summary.pdf_error.is_some());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(h.store.get_course("c1").unwrap().unwrap().status, CourseStatus::Completed);
        assert!(h.vectors.get(Some(&typed("c1", "pdf_page"))).await.unwrap().is_empty());
        assert_eq!(h.vectors.count().await.unwrap(), 0);

        let assets = h.store.list_assets("c1").unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].filetype, AssetKind::Pdf);
    }

    #[tokio::test]
    async fn test_pdf_page_write_failure_is_confined_to_pdf() {
        let h = harness_with_store(
            ScriptedTranscriber::with_segments(vec![TranscriptSegment::new(0.0, 1.0, "hello")]),
            ScriptedExtractor::with_pages(&["slide"]),
            Arc::new(TypeRejectingVectorStore::new(
                Arc::new(KeywordEmbedder::new()),
                "pdf_page",
            )),
        );

        let outcome = h.processor.run(job("c1", Some("/v.mp4"), Some("/d.pdf"))).await;

        match outcome {
            TaskOutcome::Completed(summary) => {
                assert_eq!(summary.segments_ingested, 1);
                assert_eq!(summary.pages_ingested, 0);
                assert!(summary.persona_ingested);
                assert_eq!(summary.assets_recorded, 2);
                assert!(summary.pdf_error.unwrap().contains("pdf_page"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(h.store.get_course("c1").unwrap().unwrap().status, CourseStatus::Completed);
        assert_eq!(h.store.list_assets("c1").unwrap().len(), 2);

        let entries = h.vectors.get(Some(&course_filter("c1"))).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.document == "hello"));
        let persona = h.vectors.get(Some(&typed("c1", "persona"))).await.unwrap();
        assert_eq!(persona.len(), 1);
    }

    #[tokio::test]
    async fn test_original_filename_is_recorded() {
        let h = harness(
            ScriptedTranscriber::with_segments(vec![TranscriptSegment::new(0.0, 1.0, "hello")]),
            ScriptedExtractor::failing(),
        );
        let mut job = job("수학", None, None);
        job.video = Some(StoredFile {
            path: PathBuf::from("/uploads/강사/수학/lecture%201.mp4"),
            filename: "lecture 1.mp4".to_string(),
        });

        assert!(h.processor.run(job).await.is_completed());

        let assets = h.store.list_assets("수학").unwrap();
        assert_eq!(assets[0].filename, "lecture 1.mp4");
        assert_eq!(assets[0].storage_path, "/uploads/강사/수학/lecture%201.mp4");
        let entries = h.vectors.get(Some(&typed("수학", "persona"))).await.unwrap();
        assert_eq!(entries.len(), 1);
        let segments = h.vectors.get(Some(&course_filter("수학"))).await.unwrap();
        assert!(segments.iter().any(|e| e.metadata["source"] == "lecture 1.mp4"));
    }

    #[tokio::test]
    async fn test_pdf_pages_ingested_with_page_numbers() {
        let h = harness(
            ScriptedTranscriber::failing(),
            ScriptedExtractor::with_pages(&["Slide one", "", "Slide three"]),
        );

        let outcome = h.processor.run(job("c1", None, Some("/uploads/deck.pdf"))).await;
        assert!(outcome.is_completed());

        let pages = h.vectors.get(Some(&typed("c1", "pdf_page"))).await.unwrap();
        assert_eq!(pages.len(), 2);
        let mut numbers: Vec<u64> = pages
            .iter()
            .map(|p| p.metadata["page_number"].as_u64().unwrap())
            .collect();
        numbers.sort();
        assert_eq!(numbers, vec![1, 3]);

        let persona = h.vectors.get(Some(&typed("c1", "persona"))).await.unwrap();
        assert!(persona[0].document.ends_with("Slide one"));
    }

    #[tokio::test]
    async fn test_no_assets_completes_without_entries() {
        let h = harness(ScriptedTranscriber::failing(), ScriptedExtractor::failing());

        let outcome = h.processor.run(job("c1", None, None)).await;

        assert_eq!(outcome, TaskOutcome::Completed(ProcessingSummary::default()));
        assert_eq!(h.store.get_course("c1").unwrap().unwrap().status, CourseStatus::Completed);
        assert_eq!(h.vectors.count().await.unwrap(), 0);
        assert!(h.store.list_assets("c1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_video_and_pdf_ids_do_not_collide() {
        let h = harness(
            ScriptedTranscriber::with_segments(vec![
                TranscriptSegment::new(0.0, 1.0, "first"),
                TranscriptSegment::new(1.0, 2.0, "second"),
            ]),
            ScriptedExtractor::with_pages(&["page"]),
        );

        let outcome = h.processor.run(job("c1", Some("/v.mp4"), Some("/d.pdf"))).await;
        assert!(outcome.is_completed());

        let entries = h.vectors.get(None).await.unwrap();
        let ids: Vec<String> = entries.into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["c1-doc-0", "c1-doc-1", "c1-doc-2", "c1-doc-3"]);
    }

    #[tokio::test]
    async fn test_rerun_overwrites_previous_entries() {
        let h = harness(
            ScriptedTranscriber::with_segments(vec![TranscriptSegment::new(0.0, 1.0, "hello")]),
            ScriptedExtractor::failing(),
        );

        h.processor.run(job("c1", Some("/v.mp4"), None)).await;
        h.processor.run(job("c1", Some("/v.mp4"), None)).await;

        assert_eq!(h.vectors.count().await.unwrap(), 2);
        assert_eq!(h.store.list_assets("c1").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_transcription_failure_marks_failed() {
        let h = harness(ScriptedTranscriber::failing(), ScriptedExtractor::with_pages(&["unused"]));

        let outcome = h.processor.run(job("c1", Some("/v.mp4"), Some("/d.pdf"))).await;

        assert!(matches!(outcome, TaskOutcome::Failed { .. }));
        assert_eq!(h.store.get_course("c1").unwrap().unwrap().status, CourseStatus::Failed);
        assert!(h.store.list_assets("c1").unwrap().is_empty());
        assert_eq!(h.vectors.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_status_write_is_reported() {
        let h = harness_with_store(
            ScriptedTranscriber::with_segments(vec![TranscriptSegment::new(0.0, 1.0, "hello")]),
            ScriptedExtractor::failing(),
            Arc::new(RejectingVectorStore::default()),
        );
        h.store
            .execute_batch(
                "CREATE TRIGGER reject_failed BEFORE UPDATE ON courses
                 WHEN NEW.status = 'failed'
                 BEGIN SELECT RAISE(ABORT, 'status writes disabled'); END;",
            )
            .unwrap();

        let outcome = h.processor.run(job("c1", Some("/v.mp4"), None)).await;

        match outcome {
            TaskOutcome::FailedUnrecorded { error, status_error } => {
                assert!(error.contains("store unavailable"));
                assert!(status_error.contains("status writes disabled"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(h.store.get_course("c1").unwrap().unwrap().status, CourseStatus::Processing);
    }

    #[tokio::test]
    async fn test_spawned_job_reaches_terminal_status() {
        let h = harness(
            ScriptedTranscriber::with_segments(vec![TranscriptSegment::new(0.0, 1.0, "hello")]),
            ScriptedExtractor::failing(),
        );

        let handle = h.processor.spawn(job("c1", Some("/v.mp4"), None));
        assert!(handle.await.unwrap().is_completed());
        assert_eq!(h.store.get_course("c1").unwrap().unwrap().status, CourseStatus::Completed);
    }
}

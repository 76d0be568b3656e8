//! Foreground processing of local course assets.

use crate::api::AppState;
use crate::cli::Output;
use crate::config::Settings;
use crate::processing::{ProcessingJob, TaskOutcome};
use crate::storage::StoredFile;
use anyhow::{bail, Result};
use std::path::Path;

/// Process a video and/or PDF for a course and wait for the result.
pub async fn run_process(
    course: &str,
    instructor: &str,
    video: Option<String>,
    pdf: Option<String>,
    settings: Settings,
) -> Result<()> {
    if video.is_none() && pdf.is_none() {
        Output::warning("No --video or --pdf given; only the course row will be updated.");
    }

    let video_path = video.map(|v| Settings::expand_path(&v));
    let pdf_path = pdf.map(|p| Settings::expand_path(&p));
    for path in video_path.iter().chain(pdf_path.iter()) {
        ensure_file(path)?;
    }

    let state = AppState::from_settings(&settings)?;
    let job = ProcessingJob {
        course_id: course.to_string(),
        instructor_id: instructor.to_string(),
        video: video_path.map(StoredFile::local),
        pdf: pdf_path.map(StoredFile::local),
    };

    let spinner = Output::spinner(&format!("Processing course {}...", course));
    let outcome = state.processor.run(job).await;
    spinner.finish_and_clear();

    match outcome {
        TaskOutcome::Completed(summary) => {
            Output::success(&format!("Course {} completed", course));
            Output::kv("Segments", &summary.segments_ingested.to_string());
            Output::kv("PDF pages", &summary.pages_ingested.to_string());
            Output::kv("Persona", if summary.persona_ingested { "yes" } else { "no" });
            Output::kv("Assets", &summary.assets_recorded.to_string());
            if let Some(err) = summary.pdf_error {
                Output::warning(&format!("PDF skipped: {}", err));
            }
            Ok(())
        }
        TaskOutcome::Failed { error } => {
            Output::error(&format!("Course {} failed", course));
            bail!(error)
        }
        TaskOutcome::FailedUnrecorded { error, status_error } => {
            Output::error(&format!("Course {} failed and its status could not be updated: {}", course, status_error));
            bail!(error)
        }
    }
}

fn ensure_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        bail!("File not found: {}", path.display());
    }
    Ok(())
}

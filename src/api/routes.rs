//! Route handlers.

use super::{ApiError, AppState};
use crate::db::CourseStatus;
use crate::processing::ProcessingJob;
use crate::storage::UploadedFile;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

const SERVICE_NAME: &str = "lectern";
const DEFAULT_CONVERSATION_ID: &str = "demo";

/// Build the API router.
pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload))
        .route("/status/{course_id}", get(status))
        .route("/chat/ask", post(ask))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub course_id: String,
    pub instructor_id: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub course_id: String,
    pub status: String,
    pub progress: u8,
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    pub course_id: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<String>,
    pub conversation_id: String,
    pub course_id: String,
}

/// Fields collected from the upload form.
#[derive(Default)]
struct UploadForm {
    instructor_id: Option<String>,
    course_id: Option<String>,
    video: Option<UploadedFile>,
    pdf: Option<UploadedFile>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "instructor_id" => form.instructor_id = Some(field.text().await?.trim().to_string()),
                "course_id" => form.course_id = Some(field.text().await?.trim().to_string()),
                "video" | "pdf" => {
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let bytes = field.bytes().await?;
                    // Browsers send an empty part when no file was chosen.
                    if filename.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    let file = UploadedFile {
                        filename,
                        bytes: bytes.to_vec(),
                    };
                    if name == "video" {
                        form.video = Some(file);
                    } else {
                        form.pdf = Some(file);
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }
}

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("Missing form field: {}", name)))
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok", "service": SERVICE_NAME }))
}

async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let instructor_id = required(form.instructor_id, "instructor_id")?;
    let course_id = required(form.course_id, "course_id")?;

    // Committed before scheduling so the status endpoint never sees a gap.
    state.store.begin_processing(&course_id, &instructor_id)?;

    let paths = match state
        .assets
        .save_course_assets(&instructor_id, &course_id, form.video.as_ref(), form.pdf.as_ref())
        .await
    {
        Ok(paths) => paths,
        Err(e) => {
            error!(course_id = %course_id, "Failed to store uploaded assets: {}", e);
            if let Err(status_err) = state.store.set_status(&course_id, CourseStatus::Failed) {
                error!(course_id = %course_id, "Failed to record failed status: {}", status_err);
            }
            return Err(e.into());
        }
    };

    info!(
        course_id = %course_id,
        video = paths.video.is_some(),
        pdf = paths.pdf.is_some(),
        "Scheduling course processing"
    );

    state.processor.spawn(ProcessingJob {
        course_id: course_id.clone(),
        instructor_id: instructor_id.clone(),
        video: paths.video,
        pdf: paths.pdf,
    });

    Ok(Json(UploadResponse {
        course_id,
        instructor_id,
        status: CourseStatus::Processing.to_string(),
    }))
}

async fn status(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let response = match state.store.get_course(&course_id)? {
        Some(course) => StatusResponse {
            course_id,
            status: course.status.to_string(),
            progress: course.status.progress(),
            message: None,
        },
        None => StatusResponse {
            course_id,
            status: "not_found".to_string(),
            progress: 0,
            message: None,
        },
    };

    Ok(Json(response))
}

async fn ask(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let result = state.pipeline.query(&req.question, &req.course_id).await?;

    Ok(Json(ChatResponse {
        sources: result.sources(),
        answer: result.answer,
        conversation_id: req
            .conversation_id
            .unwrap_or_else(|| DEFAULT_CONVERSATION_ID.to_string()),
        course_id: req.course_id,
    }))
}

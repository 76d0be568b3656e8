//! On-disk storage for uploaded course assets.

use crate::error::{LecternError, Result};
use regex::{Captures, Regex};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, instrument};

/// An uploaded file held in memory.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// A file on disk together with the name it should be reported under.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub path: PathBuf,
    /// Name the client gave the file; the on-disk name may be encoded.
    pub filename: String,
}

impl StoredFile {
    /// A local file reported under its own file name.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let filename = crate::transcription::file_name(&path);
        Self { path, filename }
    }
}

/// Where the assets of one upload were written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetPaths {
    pub video: Option<StoredFile>,
    pub pdf: Option<StoredFile>,
}

/// Writes assets under `{root}/{instructor_id}/{course_id}/`.
#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one course's assets. Distinct ids map to distinct directories.
    pub fn course_dir(&self, instructor_id: &str, course_id: &str) -> Result<PathBuf> {
        Ok(self
            .root
            .join(encode_component(instructor_id)?)
            .join(encode_component(course_id)?))
    }

    /// Persist the optional video and PDF for a course.
    #[instrument(skip(self, video, pdf))]
    pub async fn save_course_assets(
        &self,
        instructor_id: &str,
        course_id: &str,
        video: Option<&UploadedFile>,
        pdf: Option<&UploadedFile>,
    ) -> Result<AssetPaths> {
        let dir = self.course_dir(instructor_id, course_id)?;
        let mut paths = AssetPaths::default();

        if video.is_none() && pdf.is_none() {
            return Ok(paths);
        }

        tokio::fs::create_dir_all(&dir).await?;

        if let Some(file) = video {
            paths.video = Some(Self::write(&dir, file, "video.mp4").await?);
        }
        if let Some(file) = pdf {
            paths.pdf = Some(Self::write(&dir, file, "slides.pdf").await?);
        }

        Ok(paths)
    }

    async fn write(dir: &Path, file: &UploadedFile, fallback: &str) -> Result<StoredFile> {
        let filename = match base_name(&file.filename) {
            "" => fallback.to_string(),
            name => name.to_string(),
        };
        let path = dir.join(encode_component(&filename)?);

        tokio::fs::write(&path, &file.bytes).await?;
        debug!("Stored {} bytes at {:?}", file.bytes.len(), path);
        Ok(StoredFile { path, filename })
    }
}

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\p{L}\p{N}._-]").expect("static pattern"))
}

/// Final component of a client-supplied path, accepting either separator.
fn base_name(raw: &str) -> &str {
    raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim()
}

/// Encode a user-supplied name as a single path component.
///
/// Letters, digits, `_`, `-` and non-leading `.` pass through; every other
/// character (including `%` and separators) is percent-encoded, so the
/// mapping is injective and never escapes the parent directory.
fn encode_component(raw: &str) -> Result<String> {
    if raw.is_empty() {
        return Err(LecternError::InvalidInput("Empty path component".to_string()));
    }

    let encoded = unsafe_chars()
        .replace_all(raw, |caps: &Captures| percent_encode(&caps[0]))
        .into_owned();
    Ok(match encoded.strip_prefix('.') {
        Some(rest) => format!("%2E{}", rest),
        None => encoded,
    })
}

fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 3);
    for byte in s.bytes() {
        let _ = write!(out, "%{:02X}", byte);
    }
    out
}

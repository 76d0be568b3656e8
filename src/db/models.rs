//! Row types for the relational store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Processing lifecycle of a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    Processing,
    Completed,
    Failed,
}

impl CourseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseStatus::Processing => "processing",
            CourseStatus::Completed => "completed",
            CourseStatus::Failed => "failed",
        }
    }

    /// Percentage reported by the status endpoint: 0 while processing, 100 once terminal.
    pub fn progress(&self) -> u8 {
        match self {
            CourseStatus::Processing => 0,
            CourseStatus::Completed | CourseStatus::Failed => 100,
        }
    }
}

impl std::str::FromStr for CourseStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "processing" => Ok(CourseStatus::Processing),
            "completed" => Ok(CourseStatus::Completed),
            "failed" => Ok(CourseStatus::Failed),
            _ => Err(format!("Unknown course status: {}", s)),
        }
    }
}

impl std::fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A course row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub instructor_id: String,
    pub status: CourseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kind of uploaded asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Video,
    Pdf,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Video => "video",
            AssetKind::Pdf => "pdf",
        }
    }
}

impl std::str::FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "video" => Ok(AssetKind::Video),
            "pdf" => Ok(AssetKind::Pdf),
            _ => Err(format!("Unknown asset kind: {}", s)),
        }
    }
}

/// An asset to be recorded against a course.
#[derive(Debug, Clone)]
pub struct NewAsset {
    pub course_id: String,
    pub filename: String,
    pub storage_path: String,
    pub filetype: AssetKind,
}

/// A stored asset row (video or PDF).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub course_id: String,
    pub filename: String,
    pub storage_path: String,
    pub filetype: AssetKind,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_progress() {
        assert_eq!(CourseStatus::Processing.progress(), 0);
        assert_eq!(CourseStatus::Completed.progress(), 100);
        assert_eq!(CourseStatus::Failed.progress(), 100);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("failed".parse::<CourseStatus>().unwrap(), CourseStatus::Failed);
        assert!("not_found".parse::<CourseStatus>().is_err());
    }
}

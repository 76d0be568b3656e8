//! Status command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::db::CourseStore;
use anyhow::Result;

/// Print a course's processing status and recorded assets.
pub fn run_status(course: &str, settings: Settings) -> Result<()> {
    let store = CourseStore::open(&settings.database_path())?;

    let Some(record) = store.get_course(course)? else {
        Output::info(&format!("Course {} not found.", course));
        Output::kv("Status", "not_found");
        Output::kv("Progress", "0");
        return Ok(());
    };

    Output::header(&format!("Course {}", record.id));
    Output::kv("Instructor", &record.instructor_id);
    Output::kv("Status", record.status.as_str());
    Output::kv("Progress", &record.status.progress().to_string());
    Output::kv("Updated", &record.updated_at.format("%Y-%m-%d %H:%M:%S").to_string());

    let assets = store.list_assets(course)?;
    if !assets.is_empty() {
        Output::header("Assets");
        for asset in assets {
            Output::kv(asset.filetype.as_str(), &asset.filename);
        }
    }

    Ok(())
}

//! Relational store for instructors, courses and uploaded assets.
//!
//! Every operation takes the connection lock for the duration of a single
//! statement or transaction and releases it before returning, so no caller
//! ever holds the store across a slow external call.

mod models;

pub use models::{Asset, AssetKind, Course, CourseStatus, NewAsset};

use crate::error::{LecternError, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS instructors (
        id TEXT PRIMARY KEY,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS courses (
        id TEXT PRIMARY KEY,
        instructor_id TEXT NOT NULL REFERENCES instructors(id),
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS videos (
        id TEXT PRIMARY KEY,
        course_id TEXT NOT NULL REFERENCES courses(id),
        filename TEXT NOT NULL,
        storage_path TEXT NOT NULL,
        filetype TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_videos_course_id ON videos(course_id);
"#;

/// SQLite-backed store for course rows.
pub struct CourseStore {
    conn: Mutex<Connection>,
}

impl CourseStore {
    /// Open (or create) the database at `path`.
    #[instrument(skip_all)]
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Opened course database at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| LecternError::Storage(format!("Failed to acquire database lock: {}", e)))
    }

    /// Create the instructor and course if absent and mark the course `processing`.
    ///
    /// Both writes are conditional inserts in one transaction, so concurrent
    /// uploads for the same course cannot race between check and insert.
    /// An existing course keeps its original instructor.
    #[instrument(skip(self))]
    pub fn begin_processing(&self, course_id: &str, instructor_id: &str) -> Result<()> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now().to_rfc3339();

        tx.execute(
            "INSERT INTO instructors (id, created_at) VALUES (?1, ?2) ON CONFLICT(id) DO NOTHING",
            params![instructor_id, now],
        )?;

        tx.execute(
            r#"
            INSERT INTO courses (id, instructor_id, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                updated_at = excluded.updated_at
            "#,
            params![course_id, instructor_id, CourseStatus::Processing.as_str(), now],
        )?;

        tx.commit()?;
        debug!("Course {} marked processing", course_id);
        Ok(())
    }

    /// Set the status of an existing course. Returns false if the course does not exist.
    #[instrument(skip(self))]
    pub fn set_status(&self, course_id: &str, status: CourseStatus) -> Result<bool> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE courses SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), Utc::now().to_rfc3339(), course_id],
        )?;
        Ok(updated > 0)
    }

    pub fn get_course(&self, course_id: &str) -> Result<Option<Course>> {
        let conn = self.lock()?;
        let course = conn
            .query_row(
                "SELECT id, instructor_id, status, created_at, updated_at FROM courses WHERE id = ?1",
                params![course_id],
                |row| {
                    let status: String = row.get(2)?;
                    let created_at: String = row.get(3)?;
                    let updated_at: String = row.get(4)?;
                    Ok(Course {
                        id: row.get(0)?,
                        instructor_id: row.get(1)?,
                        status: status
                            .parse()
                            .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into()))?,
                        created_at: parse_timestamp(&created_at),
                        updated_at: parse_timestamp(&updated_at),
                    })
                },
            )
            .optional()?;
        Ok(course)
    }

    /// Record uploaded assets in a single transaction.
    #[instrument(skip_all, fields(count = assets.len()))]
    pub fn record_assets(&self, assets: &[NewAsset]) -> Result<usize> {
        if assets.is_empty() {
            return Ok(0);
        }

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now().to_rfc3339();

        for asset in assets {
            tx.execute(
                r#"
                INSERT INTO videos (id, course_id, filename, storage_path, filetype, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    Uuid::new_v4().to_string(),
                    asset.course_id,
                    asset.filename,
                    asset.storage_path,
                    asset.filetype.as_str(),
                    now,
                ],
            )?;
        }

        tx.commit()?;
        Ok(assets.len())
    }

    pub fn list_assets(&self, course_id: &str) -> Result<Vec<Asset>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, course_id, filename, storage_path, filetype, created_at
            FROM videos
            WHERE course_id = ?1
            ORDER BY created_at, filename
            "#,
        )?;

        let rows = stmt.query_map(params![course_id], |row| {
            let filetype: String = row.get(4)?;
            let created_at: String = row.get(5)?;
            Ok(Asset {
                id: row.get(0)?,
                course_id: row.get(1)?,
                filename: row.get(2)?,
                storage_path: row.get(3)?,
                filetype: filetype
                    .parse()
                    .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, e.into()))?,
                created_at: parse_timestamp(&created_at),
            })
        })?;

        let assets = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(assets)
    }

    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        self.lock()?.execute_batch(sql)?;
        Ok(())
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

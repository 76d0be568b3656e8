//! Lectern - course content ingestion and retrieval
//!
//! A backend that turns an instructor's lecture video and slide deck into a
//! per-course searchable knowledge base.
//!
//! # Overview
//!
//! Lectern allows you to:
//! - Upload a lecture video and/or PDF for a course
//! - Transcribe the video and extract the PDF page by page
//! - Index segments, pages and a derived persona prompt per course
//! - Track each course's processing status
//! - Answer questions using retrieval restricted to one course
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `db` - Instructors, courses and asset rows
//! - `storage` - Uploaded files on disk
//! - `transcription` - Speech-to-text
//! - `extraction` - PDF text extraction
//! - `embedding` - Embedding generation
//! - `vector_store` - Course-tagged vector collection
//! - `rag` - Ingestion and course-filtered retrieval
//! - `processing` - Background processing of uploads
//! - `api` - HTTP endpoints
//!
//! # Example
//!
//! ```rust,no_run
//! use lectern::config::Settings;
//! use lectern::rag::RagPipeline;
//! use lectern::vector_store::create_vector_store;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let pipeline = RagPipeline::new(create_vector_store(&settings)?);
//!
//!     let response = pipeline.query("What is a monad?", "c42").await?;
//!     println!("{:?}", response.sources());
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extraction;
pub mod openai;
pub mod processing;
pub mod rag;
pub mod storage;
pub mod transcription;
pub mod vector_store;

#[cfg(test)]
mod testing;

pub use error::{LecternError, Result};

//! Retrieval pipeline for course content.
//!
//! Ingests text into the shared vector collection under a course scope and
//! answers questions by retrieving only that course's entries.

mod pipeline;

pub use pipeline::{
    course_filter, generate_persona_prompt, IngestResult, QueryResponse, RagPipeline,
    DEFAULT_TOP_K, PERSONA_SAMPLE_CHARS, PLACEHOLDER_ANSWER,
};

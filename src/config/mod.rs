//! Configuration module for Lectern.
//!
//! Settings come from a TOML file with environment overrides on top.

mod settings;

pub use settings::{
    EmbeddingSettings, GeneralSettings, LlmSettings, ServerSettings, Settings,
    TranscriptionProvider, TranscriptionSettings, VectorStoreProvider, VectorStoreSettings,
};

//! Error types for vidqa.

use crate::transcript::TranscriptError;
use thiserror::Error;

/// Library-level error type for vidqa operations.
#[derive(Error, Debug)]
pub enum VidqaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transcript error: {0}")]
    Transcript(#[from] TranscriptError),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Text generation failed: {0}")]
    Generation(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("No content to index: {0}")]
    NoContent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("LLM API error: {0}")]
    Llm(String),
}

/// Result type alias for vidqa operations.
pub type Result<T> = std::result::Result<T, VidqaError>;

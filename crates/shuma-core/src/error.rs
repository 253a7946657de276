//! Error types for shuma

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The AI service answered, but nothing usable could be recovered from it
    #[error("Unexpected response format: {0}")]
    UnexpectedResponseFormat(String),

    /// Every extraction call of a run failed; nothing was persisted
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Session id is required")]
    MissingSessionId,
}

pub type Result<T> = std::result::Result<T, Error>;

//! Error types for reconciliation

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The remote provider failed, timed out, or returned unusable output.
    /// The orchestrator absorbs this by falling back to the local pipeline.
    #[error("Provider unavailable: {0}")]
    Provider(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error should be reported to the caller as their mistake
    /// (bad request shape or a missing record source).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidRequest(_) | Error::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

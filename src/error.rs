//! Error types for the review sentiment pipeline.
//!
//! This module provides custom error types using `thiserror` so each stage can
//! report a specific failure class while the orchestrator decides whether the
//! failure is fatal to the run, fatal to a stage, or recoverable.

use thiserror::Error;

/// Errors that can occur in the review sentiment pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Missing credentials, identifiers or invalid settings
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A required sheet does not exist in the workbook
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// Any other failure reported by the tabular backend
    #[error("Sheet backend error: {0}")]
    Sheet(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Transport errors from the HTTP clients
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The classifier service answered with something unusable
    #[error("Completion error: {0}")]
    Completion(String),

    /// Dataset shape is inconsistent (ragged rows, duplicate headers)
    #[error("Data error: {0}")]
    Data(String),

    /// Chart rendering failed
    #[error("Chart error: {0}")]
    Chart(String),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with PipelineError
pub type Result<T> = std::result::Result<T, PipelineError>;

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<config::ConfigError> for PipelineError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

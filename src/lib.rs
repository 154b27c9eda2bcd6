//! Review Sentiment Pipeline - LLM Review Classification and Insights
//!
//! A Rust library that pulls product reviews from a spreadsheet, cleans them,
//! classifies each review's sentiment through an LLM completion service and
//! reports aggregate insights.
//!
//! # Features
//!
//! - CSV-directory and Google Sheets backends for the `raw_data`, `staging`
//!   and `processed` tables
//! - Type inference and whitespace cleanup of raw rows
//! - Per-review classification with neutral fallbacks on empty input or errors
//! - Sentiment breakdown by category and top category per sentiment
//! - SVG charts and a plain-text insights report
//! - Resuming from a persisted stage

/// Sentiment breakdown and category extremes
pub mod analysis;
/// Chart rendering
pub mod charts;
/// Raw row cleanup and type inference
pub mod cleaning;
/// Configuration management
pub mod config;
/// Error types
pub mod error;
/// Completion service client
pub mod llm;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Review classification adapter
pub mod nlp;
/// Stage orchestration
pub mod pipeline;
/// Per-row classification stage
pub mod processing;
/// Insights report
pub mod report;
/// Tabular storage backends
pub mod repository;

// Re-export key components for easier access
pub use config::AppConfig;
pub use error::{PipelineError, Result};
pub use llm::{CompletionClient, CompletionRequest, GroqClient};
pub use models::{Cell, Classification, Dataset, Sentiment};
pub use nlp::ReviewClassifier;
pub use pipeline::{Pipeline, PipelineSettings};
pub use repository::{CsvWorkbook, GoogleSheetsRepository, SheetRepository};

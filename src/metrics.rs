//! Metrics emitted by the pipeline.
//!
//! Uses the `metrics` facade only. Nothing is exported unless the embedding
//! application installs a recorder, in which case these names appear.

use std::time::Duration;

use metrics::{counter, histogram};

use crate::models::{ClassificationOrigin, Sentiment};

/// Reviews classified, labelled by origin and sentiment
pub const REVIEWS_CLASSIFIED_TOTAL: &str = "review_pipeline_reviews_classified_total";
/// Rows written, labelled by sheet
pub const ROWS_WRITTEN_TOTAL: &str = "review_pipeline_rows_written_total";
/// Stage runs, labelled by stage and outcome
pub const STAGE_RUNS_TOTAL: &str = "review_pipeline_stage_runs_total";
/// Stage wall-clock time
pub const STAGE_DURATION_SECONDS: &str = "review_pipeline_stage_duration_seconds";
/// Chart files written
pub const CHARTS_RENDERED_TOTAL: &str = "review_pipeline_charts_rendered_total";

/// Count one classified review by how it was produced and its label
pub fn record_classification(origin: ClassificationOrigin, sentiment: Sentiment) {
    let origin = match origin {
        ClassificationOrigin::EmptyInput => "empty_input",
        ClassificationOrigin::Model => "model",
        ClassificationOrigin::Failed => "failed",
    };
    counter!(REVIEWS_CLASSIFIED_TOTAL, "origin" => origin, "sentiment" => sentiment.as_str()).increment(1);
}

/// Count rows written to a sheet
pub fn record_rows_written(sheet: &str, rows: usize) {
    counter!(ROWS_WRITTEN_TOTAL, "sheet" => sheet.to_string()).increment(rows as u64);
}

/// Record a stage outcome and its duration
pub fn record_stage(stage: &'static str, duration: Duration, success: bool) {
    let status = if success { "success" } else { "error" };
    counter!(STAGE_RUNS_TOTAL, "stage" => stage, "status" => status).increment(1);
    histogram!(STAGE_DURATION_SECONDS, "stage" => stage).record(duration.as_secs_f64());
}

/// Count chart files produced
pub fn record_charts(count: usize) {
    counter!(CHARTS_RENDERED_TOTAL).increment(count as u64);
}

//! Stage orchestration.
//!
//! Each stage persists its output before the next one starts, so a run can
//! be resumed from `staging` or `processed` without recomputing earlier work.
//! A stage either yields a usable result, yields `None` after logging why
//! forward progress stopped, or fails with an error that ends the run.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

use crate::analysis::{breakdown, top_classes, TopClasses};
use crate::charts::create_visualizations;
use crate::cleaning::clean;
use crate::config::{AppConfig, StartStage};
use crate::error::Result;
use crate::llm::CompletionClient;
use crate::logging::OperationTimer;
use crate::metrics;
use crate::models::Dataset;
use crate::nlp::ReviewClassifier;
use crate::processing::{classify_all, ProcessedReviews, ProcessingOptions};
use crate::report::write_report;
use crate::repository::{self, SheetRepository, PROCESSED_SHEET, RAW_SHEET, STAGING_SHEET};

/// Output locations and row-loop settings
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Pacing and progress settings for the classification loop
    pub processing: ProcessingOptions,
    /// Where the insights report is written
    pub report_path: PathBuf,
    /// Directory receiving the chart files
    pub chart_dir: PathBuf,
}

impl PipelineSettings {
    /// Settings taken from the loaded configuration
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            processing: ProcessingOptions {
                pacing_delay: Duration::from_millis(config.llm.pacing_delay_ms),
                progress_interval: config.pipeline.progress_interval,
            },
            report_path: config.report_path(),
            chart_dir: config.chart_dir(),
        }
    }
}

/// What the analysis stage produced
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    /// Rendered report text, also written to the report path
    pub report: String,
    /// Chart files written; empty when rendering failed
    pub charts: Vec<PathBuf>,
    /// Top category per sentiment
    pub top: TopClasses,
}

/// Extract, clean, classify and report, persisting after every stage
pub struct Pipeline<R, C> {
    repo: R,
    classifier: ReviewClassifier<C>,
    settings: PipelineSettings,
}

impl<R: SheetRepository, C: CompletionClient> Pipeline<R, C> {
    /// Pipeline over `repo` that classifies with `classifier`
    pub const fn new(repo: R, classifier: ReviewClassifier<C>, settings: PipelineSettings) -> Self {
        Self { repo, classifier, settings }
    }

    /// Backend the pipeline reads from and writes to
    pub const fn repository(&self) -> &R {
        &self.repo
    }

    /// Extract `raw_data`, clean it and load the result into `staging`.
    ///
    /// Returns `None` when the raw sheet holds no rows.
    pub async fn run_etl(&self) -> Result<Option<Dataset>> {
        let timer = OperationTimer::new("etl");
        let result = self.etl().await;
        finish_stage("etl", timer, &result);
        result
    }

    async fn etl(&self) -> Result<Option<Dataset>> {
        info!("Starting ETL: {RAW_SHEET} -> {STAGING_SHEET}");
        let raw = repository::extract(&self.repo, RAW_SHEET).await?;
        if raw.is_empty() {
            warn!("No data extracted from {RAW_SHEET}, stopping");
            return Ok(None);
        }

        let cleaned = clean(&raw);
        repository::load(&self.repo, STAGING_SHEET, &cleaned).await?;
        Ok(Some(cleaned))
    }

    /// Classify every review of `cleaned` and load the result into `processed`.
    ///
    /// Returns `None` when no review-text column can be found.
    pub async fn run_classification(&self, cleaned: &Dataset) -> Result<Option<ProcessedReviews>> {
        let timer = OperationTimer::new("classification");
        let result = self.classification(cleaned).await;
        finish_stage("classification", timer, &result);
        result
    }

    async fn classification(&self, cleaned: &Dataset) -> Result<Option<ProcessedReviews>> {
        let Some(idx) = cleaned.review_text_column() else {
            warn!(headers = ?cleaned.headers(), "No review text column found, stopping");
            return Ok(None);
        };
        let review_column = cleaned.headers()[idx].clone();

        let processed = classify_all(cleaned, &review_column, &self.classifier, self.settings.processing).await?;
        repository::load(&self.repo, PROCESSED_SHEET, &processed.dataset).await?;
        Ok(Some(processed))
    }

    /// Aggregate `processed`, render the charts and write the report.
    ///
    /// Returns `None` when the category or sentiment column is missing.
    pub fn run_analysis(&self, processed: &Dataset) -> Result<Option<AnalysisOutput>> {
        let timer = OperationTimer::new("analysis");
        let result = self.analysis(processed);
        finish_stage("analysis", timer, &result);
        result
    }

    fn analysis(&self, processed: &Dataset) -> Result<Option<AnalysisOutput>> {
        let Some(idx) = processed.category_column() else {
            warn!(headers = ?processed.headers(), "No category column found, skipping analysis");
            return Ok(None);
        };
        let category_column = processed.headers()[idx].clone();

        let Some((counts, pct)) = breakdown(processed, &category_column) else {
            return Ok(None);
        };
        let top = top_classes(&pct);
        for (sentiment, entry) in &top {
            info!("{}: {} ({:.1}%)", sentiment.top_key(), entry.class, entry.percentage);
        }

        let charts = create_visualizations(processed, &counts, &pct, &self.settings.chart_dir);
        let report = write_report(processed, &counts, &pct, &top, &self.settings.report_path)?;
        Ok(Some(AnalysisOutput { report, charts, top }))
    }

    /// Run every stage from extraction to the report
    pub async fn run(&self) -> Result<Option<AnalysisOutput>> {
        self.run_from(StartStage::Extract).await
    }

    /// Run from `stage`, reading the persisted output of the stage before it
    pub async fn run_from(&self, stage: StartStage) -> Result<Option<AnalysisOutput>> {
        info!(?stage, "Starting review sentiment pipeline");

        let cleaned = match stage {
            StartStage::Extract => match self.run_etl().await? {
                Some(cleaned) => Some(cleaned),
                None => return Ok(None),
            },
            StartStage::Classify => Some(repository::extract(&self.repo, STAGING_SHEET).await?),
            StartStage::Analyze => None,
        };

        let processed = match cleaned {
            Some(cleaned) => match self.run_classification(&cleaned).await? {
                Some(processed) => processed.dataset,
                None => return Ok(None),
            },
            None => repository::extract(&self.repo, PROCESSED_SHEET).await?,
        };

        let output = self.run_analysis(&processed)?;
        match &output {
            Some(out) => info!(
                report = %self.settings.report_path.display(),
                charts = out.charts.len(),
                "Pipeline complete"
            ),
            None => warn!("Pipeline stopped before the report was written"),
        }
        Ok(output)
    }
}

fn finish_stage<T>(stage: &'static str, timer: OperationTimer, result: &Result<Option<T>>) {
    let duration = timer.finish();
    metrics::record_stage(stage, duration, matches!(result, Ok(Some(_))));
}

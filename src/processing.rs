//! Classification stage: one classifier call per review, in row order.

use std::time::Duration;

use tracing::info;

use crate::error::{PipelineError, Result};
use crate::llm::CompletionClient;
use crate::metrics;
use crate::models::{
    is_blank_review, Cell, Classification, ClassificationOrigin, Dataset, Sentiment, ACTION_COLUMN,
    SENTIMENT_COLUMN, SUMMARY_COLUMN,
};
use crate::nlp::ReviewClassifier;

/// Row-loop settings
#[derive(Debug, Clone, Copy)]
pub struct ProcessingOptions {
    /// Delay after every successful classifier call
    pub pacing_delay: Duration,
    /// Log progress every this many rows
    pub progress_interval: usize,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            pacing_delay: Duration::from_millis(500),
            progress_interval: 10,
        }
    }
}

/// Tally of one classification run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationStats {
    /// Rows in the dataset
    pub total: usize,
    /// Rows sent to the classifier
    pub processed: usize,
    /// Rows skipped because the review was blank
    pub skipped: usize,
    /// Classifier calls that failed and fell back to neutral
    pub failed: usize,
    /// Positive rows
    pub positive: usize,
    /// Negative rows
    pub negative: usize,
    /// Neutral rows
    pub neutral: usize,
    /// Progress lines logged during the run
    pub progress_reports: usize,
}

impl ClassificationStats {
    fn record(&mut self, classification: &Classification) {
        match classification.origin {
            ClassificationOrigin::EmptyInput => self.skipped += 1,
            ClassificationOrigin::Model => self.processed += 1,
            ClassificationOrigin::Failed => {
                self.processed += 1;
                self.failed += 1;
            }
        }
        match classification.sentiment {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Negative => self.negative += 1,
            Sentiment::Neutral => self.neutral += 1,
        }
    }

    /// Rows with this sentiment
    #[must_use]
    pub const fn count(&self, sentiment: Sentiment) -> usize {
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Negative => self.negative,
            Sentiment::Neutral => self.neutral,
        }
    }

    /// Share of the whole dataset (skipped rows included) with this sentiment
    #[must_use]
    pub fn percentage(&self, sentiment: Sentiment) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.count(sentiment) as f64 * 100.0 / self.total as f64
        }
    }
}

/// Classified dataset plus the run tally
#[derive(Debug, Clone)]
pub struct ProcessedReviews {
    /// Input rows with the three derived columns appended
    pub dataset: Dataset,
    /// Counts for the run
    pub stats: ClassificationStats,
}

/// Classify every row of `dataset` using the review text in `review_column`.
///
/// Calls are strictly sequential and the pacing delay elapses in full after
/// each successful call before the next row is sent. Individual row failures
/// never stop the loop.
pub async fn classify_all<C: CompletionClient>(
    dataset: &Dataset,
    review_column: &str,
    classifier: &ReviewClassifier<C>,
    options: ProcessingOptions,
) -> Result<ProcessedReviews> {
    let column = dataset
        .column_index(review_column)
        .ok_or_else(|| PipelineError::Data(format!("review column not found: {review_column}")))?;

    let total = dataset.len();
    let interval = options.progress_interval.max(1);
    let mut stats = ClassificationStats { total, ..ClassificationStats::default() };
    let mut sentiments = Vec::with_capacity(total);
    let mut summaries = Vec::with_capacity(total);
    let mut actions = Vec::with_capacity(total);

    info!(rows = total, column = review_column, "Classifying reviews");

    for (i, cell) in dataset.column(column).enumerate() {
        let text = review_text(cell);
        let classification = if is_blank_review(&text) {
            Classification::empty_input()
        } else {
            classifier.classify(&text).await
        };

        if classification.origin == ClassificationOrigin::Model && !options.pacing_delay.is_zero() {
            tokio::time::sleep(options.pacing_delay).await;
        }

        stats.record(&classification);
        metrics::record_classification(classification.origin, classification.sentiment);
        actions.push(classification.action_needed().as_str().to_string());
        sentiments.push(classification.sentiment.as_str().to_string());
        summaries.push(classification.summary);

        if (i + 1) % interval == 0 {
            stats.progress_reports += 1;
            info!("Progress: {}/{} reviews", i + 1, total);
        }
    }

    let mut processed = dataset.clone();
    processed.set_text_column(SENTIMENT_COLUMN, sentiments)?;
    processed.set_text_column(SUMMARY_COLUMN, summaries)?;
    processed.set_text_column(ACTION_COLUMN, actions)?;

    log_tally(&stats);
    Ok(ProcessedReviews { dataset: processed, stats })
}

fn review_text(cell: &Cell) -> String {
    match cell {
        Cell::Missing => String::new(),
        other => other.render(),
    }
}

fn log_tally(stats: &ClassificationStats) {
    info!(
        processed = stats.processed,
        skipped = stats.skipped,
        failed = stats.failed,
        "Classification complete"
    );
    for sentiment in Sentiment::ALL {
        info!(
            "  {}: {} ({:.1}%)",
            sentiment,
            stats.count(sentiment),
            stats.percentage(sentiment)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::llm::MockCompletionClient;
    use crate::models::{ERROR_SUMMARY, NO_REVIEW_SUMMARY};

    fn options() -> ProcessingOptions {
        ProcessingOptions { pacing_delay: Duration::ZERO, progress_interval: 10 }
    }

    fn reviews(texts: &[&str]) -> Dataset {
        Dataset::new(
            vec!["Review Text".to_string()],
            texts
                .iter()
                .map(|t| vec![if t.is_empty() { Cell::Missing } else { Cell::Text((*t).to_string()) }])
                .collect(),
        )
    }

    fn text_at(ds: &Dataset, row: usize, column: &str) -> String {
        let idx = ds.column_index(column).expect("column exists");
        ds.cell(row, idx).map(Cell::render).unwrap_or_default()
    }

    #[tokio::test]
    async fn test_adds_three_columns_in_order() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .times(2)
            .returning(|req| {
                if req.prompt.contains("Terrible") {
                    Ok("SENTIMENT: Negative\nSUMMARY: Poor quality".to_string())
                } else {
                    Ok("SENTIMENT: Positive\nSUMMARY: Great product".to_string())
                }
            });
        let classifier = ReviewClassifier::new(mock, &AppConfig::default().llm).expect("classifier");

        let result = classify_all(&reviews(&["Amazing!", "", "Terrible product"]), "Review Text", &classifier, options())
            .await
            .expect("classification");

        let ds = &result.dataset;
        assert_eq!(ds.headers(), &["Review Text", SENTIMENT_COLUMN, SUMMARY_COLUMN, ACTION_COLUMN]);
        assert_eq!(text_at(ds, 0, SENTIMENT_COLUMN), "Positive");
        assert_eq!(text_at(ds, 1, SUMMARY_COLUMN), NO_REVIEW_SUMMARY);
        assert_eq!(text_at(ds, 1, ACTION_COLUMN), "No");
        assert_eq!(text_at(ds, 2, ACTION_COLUMN), "Yes");
        assert_eq!(result.stats.processed, 2);
        assert_eq!(result.stats.skipped, 1);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_batch() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .times(3)
            .returning(|_| Err(PipelineError::Completion("API Error".to_string())));
        let classifier = ReviewClassifier::new(mock, &AppConfig::default().llm).expect("classifier");

        let result = classify_all(&reviews(&["a", "b", "c"]), "Review Text", &classifier, options())
            .await
            .expect("classification");

        assert_eq!(result.stats.failed, 3);
        for row in 0..3 {
            assert_eq!(text_at(&result.dataset, row, SUMMARY_COLUMN), ERROR_SUMMARY);
            assert_eq!(text_at(&result.dataset, row, SENTIMENT_COLUMN), "Neutral");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_only_follows_successful_calls() {
        let delay = Duration::from_secs(10);
        let mut mock = MockCompletionClient::new();
        mock.expect_complete().times(3).returning(|req| {
            if req.prompt.contains("broken") {
                Err(PipelineError::Completion("rate limited".to_string()))
            } else {
                Ok("SENTIMENT: Positive\nSUMMARY: Fine".to_string())
            }
        });
        let classifier = ReviewClassifier::new(mock, &AppConfig::default().llm).expect("classifier");
        let options = ProcessingOptions { pacing_delay: delay, progress_interval: 2 };

        let start = tokio::time::Instant::now();
        let result = classify_all(&reviews(&["good", "broken", "", "good again"]), "Review Text", &classifier, options)
            .await
            .expect("classification");

        assert_eq!(start.elapsed(), delay * 2);
        assert_eq!(result.stats.failed, 1);
        assert_eq!(result.stats.skipped, 1);
        assert_eq!(result.stats.progress_reports, 2);
    }

    #[tokio::test]
    async fn test_progress_cadence() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .times(7)
            .returning(|_| Ok("SENTIMENT: Neutral\nSUMMARY: Ok".to_string()));
        let classifier = ReviewClassifier::new(mock, &AppConfig::default().llm).expect("classifier");
        let options = ProcessingOptions { pacing_delay: Duration::ZERO, progress_interval: 3 };

        let result = classify_all(&reviews(&["a", "b", "c", "d", "e", "f", "g"]), "Review Text", &classifier, options)
            .await
            .expect("classification");

        assert_eq!(result.stats.progress_reports, 2);
    }

    #[tokio::test]
    async fn test_missing_review_column() {
        let classifier =
            ReviewClassifier::new(MockCompletionClient::new(), &AppConfig::default().llm).expect("classifier");
        let result = classify_all(&reviews(&["a"]), "Body", &classifier, options()).await;
        assert!(matches!(result, Err(PipelineError::Data(_))));
    }

    #[test]
    fn test_percentages_include_skipped_rows() {
        let stats = ClassificationStats { total: 4, processed: 2, skipped: 2, failed: 0, positive: 2, negative: 0, neutral: 2, progress_reports: 0 };
        assert!((stats.percentage(Sentiment::Positive) - 50.0).abs() < f64::EPSILON);
        assert!((ClassificationStats::default().percentage(Sentiment::Neutral)).abs() < f64::EPSILON);
    }
}

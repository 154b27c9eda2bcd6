//! Insights report rendering.
//!
//! The report is plain text so it can be mailed or pasted as-is. Rendering is
//! separate from writing so the content can be tested without touching disk.

use std::fmt::Write as _;
use std::path::Path;

use chrono::Local;
use tracing::info;

use crate::analysis::{CountsTable, PercentTable, TopClasses};
use crate::error::Result;
use crate::models::{ActionNeeded, Dataset, Sentiment, ACTION_COLUMN, SENTIMENT_COLUMN};

const RULE: &str = "============================================================";
const THIN_RULE: &str = "------------------------------------------------------------";

/// Share above which a category or the whole set is flagged as negative
pub const NEGATIVE_ALERT_PCT: f64 = 30.0;

/// Overall satisfaction level derived from the positive share
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Satisfaction {
    /// More than 60% positive
    High,
    /// More than 40% positive
    Moderate,
    /// Everything else
    NeedsImprovement,
}

impl Satisfaction {
    /// Classify a positive share in percent
    #[must_use]
    pub fn from_positive_share(pct: f64) -> Self {
        if pct > 60.0 {
            Self::High
        } else if pct > 40.0 {
            Self::Moderate
        } else {
            Self::NeedsImprovement
        }
    }

    /// Label shown in the report
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Moderate => "MODERATE",
            Self::NeedsImprovement => "NEEDS IMPROVEMENT",
        }
    }
}

/// Dataset-wide figures the report is built from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overview {
    /// Rows in the dataset
    pub total: usize,
    /// Count per sentiment, canonical order
    pub sentiment_counts: [usize; 3],
    /// Rows flagged for follow-up
    pub action_needed: usize,
}

impl Overview {
    /// Tally the derived columns of a processed dataset
    #[must_use]
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let mut overview = Self { total: dataset.len(), ..Self::default() };

        if let Some(idx) = dataset.column_index(SENTIMENT_COLUMN) {
            for sentiment in dataset.column(idx).filter_map(|c| c.as_text().and_then(Sentiment::from_label)) {
                let slot = Sentiment::ALL.iter().position(|s| *s == sentiment).unwrap_or(2);
                overview.sentiment_counts[slot] += 1;
            }
        }
        if let Some(idx) = dataset.column_index(ACTION_COLUMN) {
            overview.action_needed = dataset
                .column(idx)
                .filter(|c| c.as_text().is_some_and(|t| t.trim() == ActionNeeded::Yes.as_str()))
                .count();
        }
        overview
    }

    /// Rows with this sentiment
    #[must_use]
    pub fn count(&self, sentiment: Sentiment) -> usize {
        Sentiment::ALL
            .iter()
            .position(|s| *s == sentiment)
            .map_or(0, |i| self.sentiment_counts[i])
    }

    /// Share of all rows with this sentiment
    #[must_use]
    pub fn percentage(&self, sentiment: Sentiment) -> f64 {
        share(self.count(sentiment), self.total)
    }
}

fn share(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

/// Categories whose negative share alone exceeds the alert threshold
#[must_use]
pub fn negative_hotspots(pct: &PercentTable) -> Vec<(String, f64)> {
    pct.column(Sentiment::Negative)
        .into_iter()
        .filter(|(_, p)| *p > NEGATIVE_ALERT_PCT)
        .map(|(c, p)| (c.to_string(), p))
        .collect()
}

/// Render the insights report text
#[must_use]
pub fn render_report(dataset: &Dataset, counts: &CountsTable, pct: &PercentTable, top: &TopClasses) -> String {
    let overview = Overview::from_dataset(dataset);
    let mut out = String::new();

    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "CUSTOMER REVIEW SENTIMENT INSIGHTS REPORT");
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out);

    let _ = writeln!(out, "OVERVIEW");
    let _ = writeln!(out, "{THIN_RULE}");
    let _ = writeln!(out, "Total reviews analyzed: {}", overview.total);
    let _ = writeln!(out);

    let _ = writeln!(out, "SENTIMENT DISTRIBUTION");
    let _ = writeln!(out, "{THIN_RULE}");
    for sentiment in Sentiment::ALL {
        let _ = writeln!(
            out,
            "  {:<10} {:>6} ({:.1}%)",
            format!("{sentiment}:"),
            overview.count(sentiment),
            overview.percentage(sentiment)
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "ACTION REQUIRED");
    let _ = writeln!(out, "{THIN_RULE}");
    let _ = writeln!(
        out,
        "  Reviews needing action: {} ({:.1}%)",
        overview.action_needed,
        share(overview.action_needed, overview.total)
    );
    let _ = writeln!(out);

    if !top.is_empty() {
        let _ = writeln!(out, "TOP CLASSES BY SENTIMENT");
        let _ = writeln!(out, "{THIN_RULE}");
        for (sentiment, entry) in top {
            let _ = writeln!(out, "  Highest {sentiment}: {} ({:.1}%)", entry.class, entry.percentage);
        }
        let _ = writeln!(out);
    }

    if !counts.rows.is_empty() {
        let _ = writeln!(out, "SENTIMENT BY CATEGORY");
        let _ = writeln!(out, "{THIN_RULE}");
        for row in &counts.rows {
            let cells: Vec<String> = counts
                .sentiments
                .iter()
                .zip(&row.counts)
                .map(|(s, c)| {
                    let p = pct.percentage(&row.category, *s).unwrap_or(0.0);
                    format!("{s} {c} ({p:.1}%)")
                })
                .collect();
            let _ = writeln!(out, "  {} [{} total]: {}", row.category, row.total, cells.join(", "));
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "KEY INSIGHTS");
    let _ = writeln!(out, "{THIN_RULE}");
    let positive = overview.percentage(Sentiment::Positive);
    let negative = overview.percentage(Sentiment::Negative);
    let verdict = Satisfaction::from_positive_share(positive);
    let _ = writeln!(out, "  Overall customer satisfaction: {} ({positive:.1}% positive)", verdict.label());
    if negative > NEGATIVE_ALERT_PCT {
        let _ = writeln!(
            out,
            "  ALERT: Negative sentiment is high at {negative:.1}% of reviews, investigate the main complaints"
        );
    }

    let hotspots = negative_hotspots(pct);
    if !hotspots.is_empty() {
        let _ = writeln!(out, "  Categories with negative sentiment above {NEGATIVE_ALERT_PCT:.0}%:");
        for (category, p) in &hotspots {
            let _ = writeln!(out, "    - {category}: {p:.1}% negative");
        }
    }
    let _ = writeln!(out, "{RULE}");

    out
}

/// Render the report and persist it to `path`, creating parent directories
pub fn write_report(
    dataset: &Dataset,
    counts: &CountsTable,
    pct: &PercentTable,
    top: &TopClasses,
    path: &Path,
) -> Result<String> {
    let report = render_report(dataset, counts, pct, top);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &report)?;
    info!(path = %path.display(), "Insights report saved");
    Ok(report)
}

//! Chart rendering with plotters.
//!
//! Four SVG files are written to the chart directory. SVG output needs no
//! system fonts, so rendering behaves the same on headless machines.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use plotters::element::Pie;
use plotters::prelude::*;
use tracing::{info, warn};

use crate::analysis::{CountsTable, PercentTable};
use crate::error::PipelineError;
use crate::metrics;
use crate::models::{Dataset, Sentiment};
use crate::report::Overview;

/// Pie of the overall sentiment split
pub const DISTRIBUTION_CHART: &str = "sentiment_distribution.svg";
/// Stacked percentage bars per category
pub const PERCENT_BY_CLASS_CHART: &str = "sentiment_by_class_pct.svg";
/// Grouped count bars per category
pub const COUNT_BY_CLASS_CHART: &str = "sentiment_by_class_count.svg";
/// Top categories for each sentiment
pub const TOP_CLASSES_CHART: &str = "top_classes_by_sentiment.svg";

const TOP_N: usize = 5;
const FONT: &str = "sans-serif";

const fn sentiment_color(sentiment: Sentiment) -> RGBColor {
    match sentiment {
        Sentiment::Positive => RGBColor(46, 204, 113),
        Sentiment::Negative => RGBColor(231, 76, 60),
        Sentiment::Neutral => RGBColor(149, 165, 166),
    }
}

/// Render every chart into `dir`, creating it if needed.
///
/// Failures are logged and yield an empty list; rendering never aborts a run.
#[must_use]
pub fn create_visualizations(
    dataset: &Dataset,
    counts: &CountsTable,
    pct: &PercentTable,
    dir: &Path,
) -> Vec<PathBuf> {
    match render_charts(dataset, counts, pct, dir) {
        Ok(paths) => {
            metrics::record_charts(paths.len());
            info!(count = paths.len(), dir = %dir.display(), "Charts saved");
            paths
        }
        Err(e) => {
            warn!("Chart generation failed: {e}");
            Vec::new()
        }
    }
}

/// Render every chart into `dir`, reporting the first failure.
pub fn render_charts(
    dataset: &Dataset,
    counts: &CountsTable,
    pct: &PercentTable,
    dir: &Path,
) -> crate::error::Result<Vec<PathBuf>> {
    try_create_visualizations(dataset, counts, pct, dir).map_err(|e| PipelineError::Chart(format!("{e:#}")))
}

fn try_create_visualizations(
    dataset: &Dataset,
    counts: &CountsTable,
    pct: &PercentTable,
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    if counts.rows.is_empty() || pct.rows.is_empty() {
        return Err(anyhow!("no categories to plot"));
    }

    let overview = Overview::from_dataset(dataset);
    let distribution = dir.join(DISTRIBUTION_CHART);
    let by_pct = dir.join(PERCENT_BY_CLASS_CHART);
    let by_count = dir.join(COUNT_BY_CLASS_CHART);
    let top = dir.join(TOP_CLASSES_CHART);

    distribution_pie(&overview, &distribution)?;
    stacked_percentages(pct, &by_pct)?;
    grouped_counts(counts, &by_count)?;
    top_classes_bars(pct, &top)?;

    Ok(vec![distribution, by_pct, by_count, top])
}

fn segment_label(value: &SegmentValue<i32>, names: &[&str]) -> String {
    match value {
        SegmentValue::CenterOf(i) => usize::try_from(*i)
            .ok()
            .and_then(|i| names.get(i))
            .map(ToString::to_string)
            .unwrap_or_default(),
        _ => String::new(),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn distribution_pie(overview: &Overview, path: &Path) -> Result<()> {
    let root = SVGBackend::new(path, (800, 800)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled("Overall Sentiment Distribution", (FONT, 28))?;

    let mut sizes = Vec::new();
    let mut colors = Vec::new();
    let mut labels = Vec::new();
    for sentiment in Sentiment::ALL {
        let count = overview.count(sentiment);
        if count > 0 {
            sizes.push(count as f64);
            colors.push(sentiment_color(sentiment));
            labels.push(format!("{sentiment} ({:.1}%)", overview.percentage(sentiment)));
        }
    }
    if sizes.is_empty() {
        return Err(anyhow!("no classified reviews to plot"));
    }

    let (width, height) = root.dim_in_pixel();
    let center = (width as i32 / 2, height as i32 / 2);
    let radius = f64::from(width.min(height)) * 0.35;
    let pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    root.draw(&pie)?;
    root.present()?;
    Ok(())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn stacked_percentages(pct: &PercentTable, path: &Path) -> Result<()> {
    let root = SVGBackend::new(path, (1100, 650)).into_drawing_area();
    root.fill(&WHITE)?;

    let names: Vec<&str> = pct.rows.iter().map(|r| r.category.as_str()).collect();
    let mut chart = ChartBuilder::on(&root)
        .caption("Sentiment Share by Category (%)", (FONT, 28))
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d((0..names.len() as i32).into_segmented(), 0f64..100f64)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(names.len())
        .x_label_formatter(&|v| segment_label(v, &names))
        .y_desc("Percentage")
        .draw()?;

    for (col, sentiment) in pct.sentiments.iter().enumerate() {
        let color = sentiment_color(*sentiment);
        chart
            .draw_series(pct.rows.iter().enumerate().map(|(i, row)| {
                let base: f64 = row.percentages[..col].iter().sum();
                let top = base + row.percentages[col];
                let mut bar = Rectangle::new(
                    [(SegmentValue::Exact(i as i32), base), (SegmentValue::Exact(i as i32 + 1), top)],
                    color.filled(),
                );
                bar.set_margin(0, 0, 10, 10);
                bar
            }))?
            .label(sentiment.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn grouped_counts(counts: &CountsTable, path: &Path) -> Result<()> {
    let root = SVGBackend::new(path, (1100, 650)).into_drawing_area();
    root.fill(&WHITE)?;

    // one slot per sentiment plus a gap slot per category
    let stride = counts.sentiments.len() + 1;
    let slots = (counts.rows.len() * stride) as i32;
    let names: Vec<&str> = counts.rows.iter().map(|r| r.category.as_str()).collect();
    let max = counts.rows.iter().flat_map(|r| r.counts.iter()).copied().max().unwrap_or(0);
    let y_max = (max as f64 * 1.15).max(1.0);

    let mut chart = ChartBuilder::on(&root)
        .caption("Sentiment Counts by Category", (FONT, 28))
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d((0..slots).into_segmented(), 0f64..y_max)?;

    let label_slot = (stride as i32 - 1) / 2;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(slots as usize)
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(s) if s % stride as i32 == label_slot => {
                segment_label(&SegmentValue::CenterOf(s / stride as i32), &names)
            }
            _ => String::new(),
        })
        .y_desc("Reviews")
        .draw()?;

    for (col, sentiment) in counts.sentiments.iter().enumerate() {
        let color = sentiment_color(*sentiment);
        chart
            .draw_series(counts.rows.iter().enumerate().map(|(i, row)| {
                let slot = (i * stride + col) as i32;
                let mut bar = Rectangle::new(
                    [(SegmentValue::Exact(slot), 0.0), (SegmentValue::Exact(slot + 1), row.counts[col] as f64)],
                    color.filled(),
                );
                bar.set_margin(0, 0, 2, 2);
                bar
            }))?
            .label(sentiment.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

/// Up to five categories with the highest share of `sentiment`, highest first
fn top_n(pct: &PercentTable, sentiment: Sentiment) -> Vec<(&str, f64)> {
    let mut column = pct.column(sentiment);
    column.sort_by(|a, b| b.1.total_cmp(&a.1));
    column.truncate(TOP_N);
    column
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn top_classes_bars(pct: &PercentTable, path: &Path) -> Result<()> {
    let root = SVGBackend::new(path, (1500, 550)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((1, pct.sentiments.len().max(1)));

    for (panel, sentiment) in panels.iter().zip(&pct.sentiments) {
        let entries = top_n(pct, *sentiment);
        let rows = entries.len() as i32;
        // highest share drawn at the top
        let names: Vec<&str> = entries.iter().rev().map(|(c, _)| *c).collect();
        let color = sentiment_color(*sentiment);

        let mut chart = ChartBuilder::on(panel)
            .caption(format!("Top {TOP_N} Categories: {sentiment}"), (FONT, 22))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(110)
            .build_cartesian_2d(0f64..100f64, (0..rows).into_segmented())?;

        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(names.len())
            .y_label_formatter(&|v| segment_label(v, &names))
            .x_desc("Percentage")
            .draw()?;

        chart.draw_series(entries.iter().enumerate().map(|(rank, (_, p))| {
            let j = rows - 1 - rank as i32;
            let mut bar = Rectangle::new([(0.0, SegmentValue::Exact(j)), (*p, SegmentValue::Exact(j + 1))], color.filled());
            bar.set_margin(6, 6, 0, 0);
            bar
        }))?;
    }

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_n_orders_and_truncates() {
        let rows = (0..7).map(|i| (format!("C{i}"), vec![f64::from(i) * 10.0])).collect();
        let pct = PercentTable::from_rows(vec![Sentiment::Positive], rows);
        let top = top_n(&pct, Sentiment::Positive);
        assert_eq!(top.len(), TOP_N);
        assert_eq!(top[0], ("C6", 60.0));
        assert!(top_n(&pct, Sentiment::Negative).is_empty());
    }

    #[test]
    fn test_renders_four_charts() {
        use crate::analysis::breakdown;
        use crate::models::{Cell, ACTION_COLUMN, SENTIMENT_COLUMN};

        let rows = [("Dresses", "Positive", "No"), ("Dresses", "Negative", "Yes"), ("Tops", "Neutral", "No")];
        let ds = Dataset::new(
            vec!["Class Name".to_string(), SENTIMENT_COLUMN.to_string(), ACTION_COLUMN.to_string()],
            rows.iter()
                .map(|(c, s, a)| vec![Cell::Text((*c).to_string()), Cell::Text((*s).to_string()), Cell::Text((*a).to_string())])
                .collect(),
        );
        let (counts, pct) = breakdown(&ds, "Class Name").expect("breakdown");
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let chart_dir = dir.path().join("charts");

        let paths = create_visualizations(&ds, &counts, &pct, &chart_dir);
        assert_eq!(paths.len(), 4);
        for path in &paths {
            assert!(path.exists(), "missing {}", path.display());
        }
    }

    #[test]
    fn test_nothing_to_plot_degrades_to_empty_list() {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let empty_counts = CountsTable { sentiments: Vec::new(), rows: Vec::new() };
        let empty_pct = PercentTable::from_rows(Vec::new(), Vec::new());
        let paths = create_visualizations(&Dataset::default(), &empty_counts, &empty_pct, dir.path());
        assert!(paths.is_empty());

        let err = render_charts(&Dataset::default(), &empty_counts, &empty_pct, dir.path())
            .expect_err("Empty tables must not render");
        assert!(matches!(err, PipelineError::Chart(ref msg) if msg.contains("no categories")));
    }

    #[test]
    fn test_segment_label() {
        let names = ["Dresses", "Tops"];
        assert_eq!(segment_label(&SegmentValue::CenterOf(1), &names), "Tops");
        assert_eq!(segment_label(&SegmentValue::Exact(1), &names), "");
        assert_eq!(segment_label(&SegmentValue::CenterOf(5), &names), "");
    }
}

//! Aggregation stage: sentiment breakdown by category and category extremes.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::models::{Cell, Dataset, Sentiment, SENTIMENT_COLUMN};

/// Sentiment counts per category, in first-appearance order of the categories
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountsTable {
    /// Sentiment columns present, canonical order
    pub sentiments: Vec<Sentiment>,
    /// One row per category
    pub rows: Vec<CountsRow>,
}

/// Counts for one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountsRow {
    /// Category label
    pub category: String,
    /// Count per entry of [`CountsTable::sentiments`]
    pub counts: Vec<usize>,
    /// Row total
    pub total: usize,
}

impl CountsTable {
    /// Count for one category and sentiment, zero when absent
    #[must_use]
    pub fn count(&self, category: &str, sentiment: Sentiment) -> usize {
        let Some(col) = self.sentiments.iter().position(|s| *s == sentiment) else {
            return 0;
        };
        self.rows
            .iter()
            .find(|r| r.category == category)
            .map_or(0, |r| r.counts[col])
    }

    /// Categories in table order
    pub fn categories(&self) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(|r| r.category.as_str())
    }
}

/// Sentiment percentages per category; each row sums to 100
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentTable {
    /// Sentiment columns present, canonical order
    pub sentiments: Vec<Sentiment>,
    /// One row per category
    pub rows: Vec<PercentRow>,
}

/// Percentages for one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentRow {
    /// Category label
    pub category: String,
    /// Percentage per entry of [`PercentTable::sentiments`]
    pub percentages: Vec<f64>,
}

impl PercentTable {
    /// Build a table directly from per-category percentages
    #[must_use]
    pub fn from_rows(sentiments: Vec<Sentiment>, rows: Vec<(String, Vec<f64>)>) -> Self {
        Self {
            sentiments,
            rows: rows
                .into_iter()
                .map(|(category, percentages)| PercentRow { category, percentages })
                .collect(),
        }
    }

    /// Percentage for one category and sentiment
    #[must_use]
    pub fn percentage(&self, category: &str, sentiment: Sentiment) -> Option<f64> {
        let col = self.sentiments.iter().position(|s| *s == sentiment)?;
        self.rows
            .iter()
            .find(|r| r.category == category)
            .and_then(|r| r.percentages.get(col).copied())
    }

    /// `(category, percentage)` pairs for one sentiment, table order
    #[must_use]
    pub fn column(&self, sentiment: Sentiment) -> Vec<(&str, f64)> {
        let Some(col) = self.sentiments.iter().position(|s| *s == sentiment) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter_map(|r| r.percentages.get(col).map(|p| (r.category.as_str(), *p)))
            .collect()
    }
}

/// Category with the highest share of one sentiment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopClass {
    /// Category label
    pub class: String,
    /// Its percentage for the sentiment
    pub percentage: f64,
}

/// Top category per sentiment present in the percentage table
pub type TopClasses = BTreeMap<Sentiment, TopClass>;

/// Cross-tabulate categories against sentiment labels.
///
/// Returns `None` (after logging why) when the sentiment column or the
/// category column is absent. Rows with an empty category, or with a label
/// that is not a sentiment class, are left out of the tables.
#[must_use]
pub fn breakdown(dataset: &Dataset, category_column: &str) -> Option<(CountsTable, PercentTable)> {
    let Some(sentiment_idx) = dataset.column_index(SENTIMENT_COLUMN) else {
        warn!("'{SENTIMENT_COLUMN}' column not found, cannot build sentiment breakdown");
        return None;
    };
    let Some(category_idx) = dataset.column_index(category_column) else {
        warn!("Category column '{category_column}' not found, cannot build sentiment breakdown");
        return None;
    };

    let mut order: Vec<String> = Vec::new();
    let mut counts: Vec<[usize; 3]> = Vec::new();
    let mut seen = [false; 3];
    let mut ignored = 0usize;

    for row in dataset.rows() {
        let category = match row.get(category_idx) {
            None | Some(Cell::Missing) => continue,
            Some(cell) => cell.render().trim().to_string(),
        };
        if category.is_empty() {
            continue;
        }
        let Some(sentiment) = row.get(sentiment_idx).and_then(Cell::as_text).and_then(Sentiment::from_label) else {
            ignored += 1;
            continue;
        };

        let slot = sentiment_slot(sentiment);
        seen[slot] = true;
        let pos = order.iter().position(|c| *c == category).unwrap_or_else(|| {
            order.push(category);
            counts.push([0; 3]);
            order.len() - 1
        });
        counts[pos][slot] += 1;
    }

    if ignored > 0 {
        warn!(ignored, "Rows without a valid sentiment label were left out of the breakdown");
    }

    let sentiments: Vec<Sentiment> = Sentiment::ALL.into_iter().filter(|s| seen[sentiment_slot(*s)]).collect();

    let counts_rows: Vec<CountsRow> = order
        .iter()
        .zip(&counts)
        .map(|(category, per)| {
            let values: Vec<usize> = sentiments.iter().map(|s| per[sentiment_slot(*s)]).collect();
            CountsRow { category: category.clone(), total: values.iter().sum(), counts: values }
        })
        .collect();

    let pct_rows: Vec<PercentRow> = counts_rows
        .iter()
        .map(|row| PercentRow {
            category: row.category.clone(),
            percentages: row
                .counts
                .iter()
                .map(|&c| if row.total == 0 { 0.0 } else { c as f64 * 100.0 / row.total as f64 })
                .collect(),
        })
        .collect();

    Some((
        CountsTable { sentiments: sentiments.clone(), rows: counts_rows },
        PercentTable { sentiments, rows: pct_rows },
    ))
}

/// For each sentiment present, the category with the highest percentage.
///
/// Ties go to the category that comes first in the table, i.e. the one that
/// first appeared in the dataset.
#[must_use]
pub fn top_classes(pct: &PercentTable) -> TopClasses {
    let mut result = TopClasses::new();
    for sentiment in Sentiment::ALL {
        let mut best: Option<(&str, f64)> = None;
        for (category, value) in pct.column(sentiment) {
            if best.map_or(true, |(_, b)| value > b) {
                best = Some((category, value));
            }
        }
        if let Some((class, percentage)) = best {
            result.insert(sentiment, TopClass { class: class.to_string(), percentage });
        }
    }
    result
}

const fn sentiment_slot(sentiment: Sentiment) -> usize {
    match sentiment {
        Sentiment::Positive => 0,
        Sentiment::Negative => 1,
        Sentiment::Neutral => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(rows: &[(&str, &str)]) -> Dataset {
        Dataset::new(
            vec!["Class Name".to_string(), SENTIMENT_COLUMN.to_string()],
            rows.iter()
                .map(|(c, s)| vec![Cell::Text((*c).to_string()), Cell::Text((*s).to_string())])
                .collect(),
        )
    }

    #[test]
    fn test_breakdown_counts_and_totals() {
        let ds = dataset(&[("Dresses", "Positive"), ("Dresses", "Negative"), ("Tops", "Positive"), ("Tops", "Positive")]);
        let (counts, pct) = breakdown(&ds, "Class Name").expect("breakdown");

        assert_eq!(counts.sentiments, vec![Sentiment::Positive, Sentiment::Negative]);
        assert_eq!(counts.categories().collect::<Vec<_>>(), vec!["Dresses", "Tops"]);
        assert_eq!(counts.count("Tops", Sentiment::Negative), 0);
        assert_eq!(counts.rows[0].total, 2);
        assert_eq!(pct.percentage("Dresses", Sentiment::Positive), Some(50.0));
        assert_eq!(pct.percentage("Tops", Sentiment::Positive), Some(100.0));
        assert_eq!(pct.percentage("Tops", Sentiment::Neutral), None);
    }

    #[test]
    fn test_breakdown_missing_columns() {
        let no_sentiment = Dataset::new(vec!["Class Name".to_string()], Vec::new());
        assert!(breakdown(&no_sentiment, "Class Name").is_none());

        let ds = dataset(&[("Dresses", "Positive")]);
        assert!(breakdown(&ds, "Product").is_none());
    }

    #[test]
    fn test_breakdown_skips_blank_categories_and_bad_labels() {
        let ds = dataset(&[("", "Positive"), ("Tops", "Great"), ("Tops", "neutral")]);
        let (counts, _) = breakdown(&ds, "Class Name").expect("breakdown");
        assert_eq!(counts.rows.len(), 1);
        assert_eq!(counts.count("Tops", Sentiment::Neutral), 1);
        assert_eq!(counts.rows[0].total, 1);
    }

    #[test]
    fn test_breakdown_tolerates_short_rows() {
        let ds = Dataset::new(
            vec!["Class Name".to_string(), SENTIMENT_COLUMN.to_string()],
            vec![
                vec![Cell::Text("Dresses".to_string()), Cell::Text("Positive".to_string())],
                vec![Cell::Text("Tops".to_string())],
                Vec::new(),
            ],
        );
        let (counts, _) = breakdown(&ds, "Class Name").expect("breakdown");
        assert_eq!(counts.categories().collect::<Vec<_>>(), vec!["Dresses"]);
        assert_eq!(counts.rows[0].total, 1);
    }

    #[test]
    fn test_top_classes() {
        let pct = PercentTable::from_rows(
            vec![Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral],
            vec![
                ("Dresses".to_string(), vec![80.0, 10.0, 10.0]),
                ("Tops".to_string(), vec![20.0, 70.0, 10.0]),
            ],
        );
        let top = top_classes(&pct);
        assert_eq!(top[&Sentiment::Positive].class, "Dresses");
        assert_eq!(top[&Sentiment::Negative].class, "Tops");
        // tie on Neutral goes to the first category
        assert_eq!(top[&Sentiment::Neutral].class, "Dresses");
    }

    #[test]
    fn test_top_classes_omits_absent_sentiments() {
        let pct = PercentTable::from_rows(vec![Sentiment::Positive], vec![("A".to_string(), vec![100.0])]);
        let top = top_classes(&pct);
        assert_eq!(top.len(), 1);
        assert!(top.get(&Sentiment::Negative).is_none());

        assert!(top_classes(&PercentTable::from_rows(Vec::new(), Vec::new())).is_empty());
    }
}

//! Data models for review handling
//!
//! This module contains the tabular dataset that flows between pipeline
//! stages together with the sentiment types attached to each review.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Column that receives the sentiment label
pub const SENTIMENT_COLUMN: &str = "AI Sentiment";
/// Column that receives the one-line summary
pub const SUMMARY_COLUMN: &str = "AI Summary";
/// Column that receives the action-needed flag
pub const ACTION_COLUMN: &str = "Action Needed?";

/// Summary used when a review has no text
pub const NO_REVIEW_SUMMARY: &str = "No review text provided";
/// Summary used when the classifier call failed
pub const ERROR_SUMMARY: &str = "Error processing review";

/// A single cell value after type inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    /// Explicit missing value
    Missing,
    /// Text value
    Text(String),
    /// Integral value, kept exact
    Integer(i64),
    /// Numeric value with a fractional part or exponent
    Number(f64),
}

impl Cell {
    /// True for missing cells and text cells that contain only whitespace
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Integer(_) | Self::Number(_) => false,
        }
    }

    /// Text content of the cell, if it holds text
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the cell the way it is written back to a sheet
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Missing => String::new(),
            Self::Text(s) => s.clone(),
            Self::Integer(n) => n.to_string(),
            Self::Number(n) => format_number(*n),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Integral values are written without a fractional part so `25` stays `25`.
#[allow(clippy::cast_possible_truncation)]
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Inferred type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Free text values
    Text,
    /// Every non-empty value parsed as a number
    Numeric,
}

/// Rectangular table of review rows with a header
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    headers: Vec<String>,
    kinds: Vec<ColumnKind>,
    rows: Vec<Vec<Cell>>,
}

impl Dataset {
    /// Build a dataset of text columns from a header and rows.
    ///
    /// No shape checks are done here; see [`Dataset::validate`].
    #[must_use]
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let kinds = vec![ColumnKind::Text; headers.len()];
        Self { headers, kinds, rows }
    }

    /// Build a dataset from raw sheet values where the first row is the header.
    ///
    /// Short rows are padded with missing cells (sheet APIs drop trailing
    /// blanks). Rows wider than the header are rejected.
    pub fn from_values(values: Vec<Vec<String>>) -> Result<Self> {
        let mut iter = values.into_iter();
        let Some(headers) = iter.next() else {
            return Ok(Self::default());
        };
        let width = headers.len();

        let mut rows = Vec::new();
        for (i, raw) in iter.enumerate() {
            if raw.len() > width {
                return Err(PipelineError::Data(format!(
                    "row {} has {} values but the header has {width}",
                    i + 1,
                    raw.len()
                )));
            }
            let mut row: Vec<Cell> = raw.into_iter().map(Cell::Text).collect();
            row.resize(width, Cell::Missing);
            rows.push(row);
        }

        Ok(Self::new(headers, rows))
    }

    /// Render the dataset as sheet values, header first
    #[must_use]
    pub fn to_values(&self) -> Vec<Vec<String>> {
        std::iter::once(self.headers.clone())
            .chain(self.rows.iter().map(|row| row.iter().map(Cell::render).collect()))
            .collect()
    }

    /// Check that every row matches the header width and headers are unique
    pub fn validate(&self) -> Result<()> {
        if self.kinds.len() != self.headers.len() {
            return Err(PipelineError::Data("column kinds do not match headers".to_string()));
        }
        for (i, header) in self.headers.iter().enumerate() {
            if self.headers[..i].contains(header) {
                return Err(PipelineError::Data(format!("duplicate column header: {header}")));
            }
        }
        if let Some((i, row)) = self.rows.iter().enumerate().find(|(_, r)| r.len() != self.headers.len()) {
            return Err(PipelineError::Data(format!(
                "row {i} has {} cells but the header has {}",
                row.len(),
                self.headers.len()
            )));
        }
        Ok(())
    }

    /// Column names in order
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Inferred column kinds in header order
    #[must_use]
    pub fn kinds(&self) -> &[ColumnKind] {
        &self.kinds
    }

    /// All rows in order
    #[must_use]
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the dataset holds no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the column with exactly this name
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell at `row`, `column`
    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Iterate one column's cells top to bottom
    pub fn column(&self, column: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().filter_map(move |row| row.get(column))
    }

    /// First column whose name contains every needle, ignoring case
    #[must_use]
    pub fn find_column_containing(&self, needles: &[&str]) -> Option<usize> {
        self.headers.iter().position(|header| {
            let lower = header.to_lowercase();
            needles.iter().all(|needle| lower.contains(&needle.to_lowercase()))
        })
    }

    /// Column holding the free-text review body
    #[must_use]
    pub fn review_text_column(&self) -> Option<usize> {
        self.find_column_containing(&["review", "text"])
    }

    /// Column holding the category label (e.g. `Class Name`)
    #[must_use]
    pub fn category_column(&self) -> Option<usize> {
        self.find_column_containing(&["class"])
    }

    /// Append a text column, replacing any existing column of the same name.
    ///
    /// Fails on a ragged dataset or when `values` does not match the row count.
    pub fn set_text_column(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        let width = self.headers.len();
        if let Some(i) = self.rows.iter().position(|r| r.len() != width) {
            return Err(PipelineError::Data(format!("row {i} does not match the header width {width}")));
        }
        if values.len() != self.rows.len() {
            return Err(PipelineError::Data(format!(
                "column {name} has {} values for {} rows",
                values.len(),
                self.rows.len()
            )));
        }

        match self.column_index(name) {
            Some(idx) => {
                self.kinds[idx] = ColumnKind::Text;
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = Cell::Text(value);
                }
            }
            None => {
                self.headers.push(name.to_string());
                self.kinds.push(ColumnKind::Text);
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(Cell::Text(value));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Vec<ColumnKind>, Vec<Vec<Cell>>) {
        (self.headers, self.kinds, self.rows)
    }

    pub(crate) const fn from_parts(headers: Vec<String>, kinds: Vec<ColumnKind>, rows: Vec<Vec<Cell>>) -> Self {
        Self { headers, kinds, rows }
    }
}

/// Sentiment class assigned to a review
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    /// Customer likes the product
    Positive,
    /// Customer dislikes the product
    Negative,
    /// Mixed feelings, facts only, or no usable signal
    Neutral,
}

impl Sentiment {
    /// Every class in canonical report order
    pub const ALL: [Self; 3] = [Self::Positive, Self::Negative, Self::Neutral];

    /// Label written to the sheet
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
            Self::Neutral => "Neutral",
        }
    }

    /// Key used for the top-class entry of this sentiment
    #[must_use]
    pub const fn top_key(self) -> &'static str {
        match self {
            Self::Positive => "highest_positive",
            Self::Negative => "highest_negative",
            Self::Neutral => "highest_neutral",
        }
    }

    /// Exact (case-insensitive) label lookup, used when reading processed sheets
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(label.trim()))
    }

    /// Lenient mapping from verbose model output: substring match on
    /// "positive" then "negative", anything else is Neutral.
    #[must_use]
    pub fn from_model_output(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        if lower.contains("positive") {
            Self::Positive
        } else if lower.contains("negative") {
            Self::Negative
        } else {
            Self::Neutral
        }
    }

    /// Negative reviews require follow-up
    #[must_use]
    pub const fn action_needed(self) -> ActionNeeded {
        match self {
            Self::Negative => ActionNeeded::Yes,
            Self::Positive | Self::Neutral => ActionNeeded::No,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Follow-up flag derived from the sentiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionNeeded {
    /// Review needs a response
    Yes,
    /// No follow-up
    No,
}

impl ActionNeeded {
    /// Label written to the sheet
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
        }
    }
}

impl fmt::Display for ActionNeeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a classification came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassificationOrigin {
    /// Input was empty; no external call was made
    EmptyInput,
    /// Parsed from a successful model response
    Model,
    /// The external call failed and the neutral fallback was used
    Failed,
}

/// Result of classifying one review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Sentiment class
    pub sentiment: Sentiment,
    /// One-line summary
    pub summary: String,
    /// How the result was produced
    pub origin: ClassificationOrigin,
}

impl Classification {
    /// Result for a review with no text
    #[must_use]
    pub fn empty_input() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            summary: NO_REVIEW_SUMMARY.to_string(),
            origin: ClassificationOrigin::EmptyInput,
        }
    }

    /// Result for a review whose classifier call failed
    #[must_use]
    pub fn failed() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            summary: ERROR_SUMMARY.to_string(),
            origin: ClassificationOrigin::Failed,
        }
    }

    /// Follow-up flag for this result
    #[must_use]
    pub const fn action_needed(&self) -> ActionNeeded {
        self.sentiment.action_needed()
    }
}

/// True for text the pipeline treats as "no review": empty, whitespace or `nan`
#[must_use]
pub fn is_blank_review(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan")
}

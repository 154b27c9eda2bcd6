//! Cleaning stage: type inference, whitespace and null normalization.
//!
//! Cleaning never fails from the caller's point of view. If the dataset is
//! malformed the original rows are passed through untouched and a warning is
//! logged.

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::{Cell, ColumnKind, Dataset};

/// Values in the review column that mean "no review"
const EMPTY_LIKE: [&str; 4] = ["", "nan", "NaN", "None"];

/// What the cleaning pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleaningReport {
    /// Rows before cleaning
    pub rows_in: usize,
    /// Rows after dropping fully-empty rows
    pub rows_out: usize,
    /// Columns that were inferred as numeric
    pub numeric_columns: Vec<String>,
    /// Missing reviews, when a review text column exists
    pub review_missing: Option<usize>,
}

impl CleaningReport {
    /// Rows removed because every cell was empty
    #[must_use]
    pub const fn rows_dropped(&self) -> usize {
        self.rows_in - self.rows_out
    }
}

/// Clean a raw dataset, degrading to a pass-through copy on any failure.
#[must_use]
pub fn clean(raw: &Dataset) -> Dataset {
    match clean_with_report(raw) {
        Ok((cleaned, report)) => {
            info!(
                rows_in = report.rows_in,
                rows_out = report.rows_out,
                dropped = report.rows_dropped(),
                numeric_columns = ?report.numeric_columns,
                "Cleaning complete"
            );
            cleaned
        }
        Err(e) => {
            warn!("Cleaning failed, passing raw data through unchanged: {e}");
            raw.clone()
        }
    }
}

/// Clean a raw dataset and describe what changed.
pub fn clean_with_report(raw: &Dataset) -> Result<(Dataset, CleaningReport)> {
    raw.validate()?;

    let review_column = raw.review_text_column();
    let (headers, _, rows) = raw.clone().into_parts();
    let rows_in = rows.len();
    let mut columns = transpose(rows, headers.len());

    let mut kinds = Vec::with_capacity(headers.len());
    let mut numeric_columns = Vec::new();
    for (name, column) in headers.iter().zip(columns.iter_mut()) {
        let kind = infer_column(column);
        if kind == ColumnKind::Numeric {
            debug!(column = %name, "Inferred numeric column");
            numeric_columns.push(name.clone());
        }
        kinds.push(kind);
    }

    let mut review_missing = None;
    if let Some(idx) = review_column.filter(|&i| kinds[i] == ColumnKind::Text) {
        let missing = mark_missing_reviews(&mut columns[idx]);
        info!(column = %headers[idx], missing, "Missing review text");
        review_missing = Some(missing);
    }

    for (kind, column) in kinds.iter().zip(columns.iter_mut()) {
        if *kind == ColumnKind::Text {
            normalize_text(column);
        }
    }

    let rows: Vec<Vec<Cell>> = untranspose(columns, rows_in)
        .into_iter()
        .filter(|row| !row.iter().all(Cell::is_empty))
        .collect();

    let report = CleaningReport {
        rows_in,
        rows_out: rows.len(),
        numeric_columns,
        review_missing,
    };
    Ok((Dataset::from_parts(headers, kinds, rows), report))
}

/// Convert the column to numbers only if every non-empty value parses.
/// Mixed columns are left exactly as they were.
fn infer_column(column: &mut [Cell]) -> ColumnKind {
    let mut parsed = Vec::with_capacity(column.len());
    let mut seen_value = false;

    for cell in column.iter() {
        match cell {
            Cell::Integer(_) | Cell::Number(_) => {
                seen_value = true;
                parsed.push(cell.clone());
            }
            Cell::Missing => parsed.push(Cell::Missing),
            Cell::Text(s) => {
                let trimmed = s.trim();
                if EMPTY_LIKE.contains(&trimmed) {
                    parsed.push(Cell::Missing);
                    continue;
                }
                let Some(value) = parse_number(trimmed) else {
                    return ColumnKind::Text;
                };
                seen_value = true;
                parsed.push(value);
            }
        }
    }

    if !seen_value {
        return ColumnKind::Text;
    }

    for (cell, value) in column.iter_mut().zip(parsed) {
        *cell = value;
    }
    ColumnKind::Numeric
}

/// Parse a trimmed value without losing digits.
///
/// Integer literals must fit `i64`; wider ones are left as text rather than
/// rounded through `f64`.
fn parse_number(value: &str) -> Option<Cell> {
    let digits = value.strip_prefix(&['-', '+'][..]).unwrap_or(value);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return value.parse::<i64>().ok().map(Cell::Integer);
    }
    match value.parse::<f64>() {
        Ok(n) if n.is_finite() => Some(Cell::Number(n)),
        _ => None,
    }
}

fn mark_missing_reviews(column: &mut [Cell]) -> usize {
    let mut missing = 0;
    for cell in column.iter_mut() {
        let empty = match cell {
            Cell::Missing => true,
            Cell::Text(s) => EMPTY_LIKE.contains(&s.trim()),
            Cell::Integer(_) | Cell::Number(_) => false,
        };
        if empty {
            *cell = Cell::Missing;
            missing += 1;
        }
    }
    missing
}

fn normalize_text(column: &mut [Cell]) {
    for cell in column.iter_mut() {
        if let Cell::Text(s) = cell {
            let trimmed = s.trim();
            *s = if trimmed == "nan" { String::new() } else { trimmed.to_string() };
        }
    }
}

fn transpose(rows: Vec<Vec<Cell>>, width: usize) -> Vec<Vec<Cell>> {
    let mut columns: Vec<Vec<Cell>> = (0..width).map(|_| Vec::with_capacity(rows.len())).collect();
    for row in rows {
        for (column, cell) in columns.iter_mut().zip(row) {
            column.push(cell);
        }
    }
    columns
}

fn untranspose(columns: Vec<Vec<Cell>>, height: usize) -> Vec<Vec<Cell>> {
    let mut rows: Vec<Vec<Cell>> = (0..height).map(|_| Vec::with_capacity(columns.len())).collect();
    for column in columns {
        for (row, cell) in rows.iter_mut().zip(column) {
            row.push(cell);
        }
    }
    rows
}

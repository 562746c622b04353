//! Table Module
//! Typed cells and the in-memory table every operation consumes.

use crate::error::{AnalyticsError, Result};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::Serialize;
use std::fmt;
use std::io;

/// Delimiters are single ASCII bytes.
pub(crate) fn delimiter_byte(delimiter: char) -> Result<u8> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| {
            AnalyticsError::invalid(
                "delimiter",
                format!("'{delimiter}' is not a single ASCII character"),
            )
        })
}

/// A single parsed value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl Cell {
    /// Classify a raw token: empty → Missing, finite double → Number, else Text.
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        if token.is_empty() {
            return Cell::Missing;
        }
        match token.parse::<f64>() {
            Ok(v) if v.is_finite() => Cell::Number(v),
            _ => Cell::Text(token.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(v) => write!(f, "{v}"),
            Cell::Text(s) => f.write_str(s),
            Cell::Missing => Ok(()),
        }
    }
}

/// Header labels plus data rows of equal width.
///
/// Row indices reported by every operation are positions in `rows`
/// (the header is not counted).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Vec<Cell>>,
    has_header: bool,
}

impl Table {
    /// Build a table; rows must already match the header width.
    pub(crate) fn from_parts(header: Vec<String>, rows: Vec<Vec<Cell>>, has_header: bool) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == header.len()));
        Self {
            header,
            rows,
            has_header,
        }
    }

    /// Same header and flag, different rows.
    pub(crate) fn with_rows(&self, rows: Vec<Vec<Cell>>) -> Self {
        Self::from_parts(self.header.clone(), rows, self.has_header)
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Whether the first line of the source was a header row.
    pub fn has_header(&self) -> bool {
        self.has_header
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    pub fn column_name(&self, index: usize) -> &str {
        self.header.get(index).map(String::as_str).unwrap_or("")
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    /// Number cells of one column; Text and Missing are skipped, not coerced.
    pub fn numeric_values(&self, index: usize) -> Vec<f64> {
        self.column(index).filter_map(Cell::as_number).collect()
    }

    /// A column is numeric when it holds at least one Number cell.
    pub fn is_numeric_column(&self, index: usize) -> bool {
        self.column(index).any(|c| matches!(c, Cell::Number(_)))
    }

    pub fn numeric_columns(&self) -> Vec<usize> {
        (0..self.column_count())
            .filter(|&i| self.is_numeric_column(i))
            .collect()
    }

    /// First `limit` data rows, or everything when `None`.
    pub fn limited(&self, limit: Option<usize>) -> Table {
        match limit {
            Some(n) if n < self.rows.len() => self.with_rows(self.rows[..n].to_vec()),
            _ => self.clone(),
        }
    }

    /// Serialize back to delimited text, one record per line. Headerless tables are written
    /// without labels. Fields are never quoted.
    pub fn to_delimited(&self, delimiter: char) -> Result<String> {
        let mut writer = WriterBuilder::new()
            .delimiter(delimiter_byte(delimiter)?)
            .quote_style(QuoteStyle::Never)
            .terminator(Terminator::Any(b'\n'))
            .has_headers(false)
            .from_writer(Vec::new());

        if self.has_header {
            writer.write_record(&self.header)?;
        }
        for row in &self.rows {
            writer.write_record(row.iter().map(Cell::to_string))?;
        }

        let bytes = writer.into_inner().map_err(|e| e.into_error())?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
    }
}

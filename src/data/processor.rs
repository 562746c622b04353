//! Data Processor Module
//! Cleaning, min-max normalization, unary transforms and IQR outlier filtering.
//!
//! Every operation returns a new [`Table`]; the input is never mutated.

use crate::data::table::{Cell, Table};
use crate::error::{AnalyticsError, Result};
use crate::stats::{median, percentile, sorted};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// How missing cells are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CleaningPolicy {
    /// Drop every row holding a Missing cell.
    Remove,
    /// Fill Missing cells with the column median.
    Replace,
}

impl FromStr for CleaningPolicy {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remove" => Ok(Self::Remove),
            "replace" => Ok(Self::Replace),
            other => Err(AnalyticsError::invalid(
                "policy",
                format!("expected 'remove' or 'replace', got '{other}'"),
            )),
        }
    }
}

/// Unary transform applied to one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    Log,
    Sqrt,
}

impl TransformKind {
    fn apply(self, v: f64) -> Option<f64> {
        match self {
            Self::Log if v > 0.0 => Some(v.ln()),
            Self::Sqrt if v >= 0.0 => Some(v.sqrt()),
            _ => None,
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Log => "log",
            Self::Sqrt => "sqrt",
        })
    }
}

impl FromStr for TransformKind {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" | "ln" => Ok(Self::Log),
            "sqrt" => Ok(Self::Sqrt),
            other => Err(AnalyticsError::invalid(
                "transform",
                format!("expected 'log' or 'sqrt', got '{other}'"),
            )),
        }
    }
}

/// Cleaned table plus what happened to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleaningReport {
    pub policy: CleaningPolicy,
    pub table: Table,
    pub removed_rows: usize,
    pub replaced_cells: usize,
    /// Columns with Missing cells but no Number to take a median from.
    pub skipped_columns: Vec<String>,
}

/// IQR fence bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Fences {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Fences {
    pub fn contains(&self, v: f64) -> bool {
        v >= self.lower && v <= self.upper
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierReport {
    pub column: String,
    pub fences: Fences,
    /// Rows whose value lies inside the fences.
    pub table: Table,
    pub outlier_rows: Vec<usize>,
    /// Rows dropped because their value was not a Number.
    pub non_numeric_rows: Vec<usize>,
}

/// Handles data cleaning and transformation operations.
pub struct DataProcessor;

impl DataProcessor {
    pub fn clean(table: &Table, policy: CleaningPolicy) -> CleaningReport {
        let report = match policy {
            CleaningPolicy::Remove => {
                let rows: Vec<Vec<Cell>> = table
                    .rows()
                    .iter()
                    .filter(|row| !row.iter().any(Cell::is_missing))
                    .cloned()
                    .collect();
                CleaningReport {
                    policy,
                    removed_rows: table.row_count() - rows.len(),
                    table: table.with_rows(rows),
                    replaced_cells: 0,
                    skipped_columns: Vec::new(),
                }
            }
            CleaningPolicy::Replace => Self::replace_missing(table),
        };

        for column in &report.skipped_columns {
            warn!(column = %column, "no numeric values to impute from; missing cells kept");
        }
        info!(
            ?policy,
            removed = report.removed_rows,
            replaced = report.replaced_cells,
            "table cleaned"
        );
        report
    }

    fn replace_missing(table: &Table) -> CleaningReport {
        let mut rows = table.rows().to_vec();
        let mut replaced_cells = 0;
        let mut skipped_columns = Vec::new();

        for col in 0..table.column_count() {
            if !table.column(col).any(Cell::is_missing) {
                continue;
            }
            let Some(fill) = median(&table.numeric_values(col)) else {
                skipped_columns.push(table.column_name(col).to_string());
                continue;
            };
            for row in rows.iter_mut() {
                if row[col].is_missing() {
                    row[col] = Cell::Number(fill);
                    replaced_cells += 1;
                }
            }
        }

        CleaningReport {
            policy: CleaningPolicy::Replace,
            table: table.with_rows(rows),
            removed_rows: 0,
            replaced_cells,
            skipped_columns,
        }
    }

    /// Rescale every numeric column to `[0, 1]`. Text and Missing cells pass through.
    pub fn normalize(table: &Table) -> Result<Table> {
        let mut rows = table.rows().to_vec();

        for col in table.numeric_columns() {
            let values = table.numeric_values(col);
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            // the range of finite values can still overflow; work on halves then
            let halve = !(max - min).is_finite();
            let scale = |v: f64| if halve { v / 2.0 } else { v };
            let (lo, hi) = (scale(min), scale(max));
            let span = hi - lo;
            if span == 0.0 {
                return Err(AnalyticsError::DegenerateColumn {
                    column: table.column_name(col).to_string(),
                });
            }
            for row in rows.iter_mut() {
                if let Cell::Number(v) = row[col] {
                    row[col] = Cell::Number((scale(v) - lo) / span);
                }
            }
        }

        info!(columns = table.numeric_columns().len(), "min-max normalization applied");
        Ok(table.with_rows(rows))
    }

    /// Apply `kind` to every Number in one column; out-of-domain values abort with the row.
    pub fn transform(table: &Table, col: usize, kind: TransformKind) -> Result<Table> {
        let column = table.column_name(col).to_string();
        if !table.is_numeric_column(col) {
            return Err(AnalyticsError::InsufficientData {
                column,
                required: 1,
                actual: 0,
            });
        }

        let mut rows = table.rows().to_vec();
        for (i, row) in rows.iter_mut().enumerate() {
            if let Cell::Number(v) = row[col] {
                let out = kind.apply(v).ok_or_else(|| AnalyticsError::Domain {
                    column: column.clone(),
                    row: i,
                    value: v,
                    transform: kind.to_string(),
                })?;
                row[col] = Cell::Number(out);
            }
        }

        info!(column = %column, transform = %kind, "transform applied");
        Ok(table.with_rows(rows))
    }

    /// Q1/Q3 (nearest rank) and 1.5×IQR fences over the column's Number cells.
    pub fn fences(table: &Table, col: usize) -> Result<Fences> {
        let values = sorted(&table.numeric_values(col));
        let (Some(q1), Some(q3)) = (percentile(&values, 25.0), percentile(&values, 75.0)) else {
            return Err(AnalyticsError::InsufficientData {
                column: table.column_name(col).to_string(),
                required: 1,
                actual: 0,
            });
        };
        let iqr = q3 - q1;
        Ok(Fences {
            q1,
            q3,
            iqr,
            lower: q1 - 1.5 * iqr,
            upper: q3 + 1.5 * iqr,
        })
    }

    /// Keep rows inside the fences of `col` (default: last column).
    /// Rows without a Number in that column are dropped and listed separately.
    pub fn filter_outliers(table: &Table, col: Option<usize>) -> Result<OutlierReport> {
        let col = match col {
            Some(c) => c,
            None => table
                .column_count()
                .checked_sub(1)
                .ok_or_else(|| AnalyticsError::invalid("column", "table has no columns"))?,
        };
        let fences = Self::fences(table, col)?;

        let mut kept = Vec::new();
        let mut outlier_rows = Vec::new();
        let mut non_numeric_rows = Vec::new();
        for (i, row) in table.rows().iter().enumerate() {
            match row[col].as_number() {
                Some(v) if fences.contains(v) => kept.push(row.clone()),
                Some(_) => outlier_rows.push(i),
                None => non_numeric_rows.push(i),
            }
        }

        info!(
            column = table.column_name(col),
            outliers = outlier_rows.len(),
            lower = fences.lower,
            upper = fences.upper,
            "outliers filtered"
        );
        Ok(OutlierReport {
            column: table.column_name(col).to_string(),
            fences,
            table: table.with_rows(kept),
            outlier_rows,
            non_numeric_rows,
        })
    }
}

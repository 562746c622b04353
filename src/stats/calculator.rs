//! Statistics Calculator Module
//! Descriptive statistics (central tendency, dispersion, shape, quantiles) per numeric column.

use crate::data::Table;
use crate::error::{AnalyticsError, Result};
use rayon::prelude::*;
use serde::Serialize;
use statrs::statistics::Statistics;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{info, warn};

/// Statistics for a single numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsRecord {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Every value sharing the highest frequency, ascending.
    pub mode: Vec<f64>,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    /// Population variance (divisor n).
    pub variance: f64,
    pub std_dev: f64,
    pub iqr: f64,
    /// `None` when the standard deviation is zero.
    pub skewness: Option<f64>,
    /// Excess kurtosis; `None` when the standard deviation is zero.
    pub kurtosis: Option<f64>,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
}

/// Sort ascending with numeric comparison.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

/// Middle element, or the mean of the two middle elements. `None` for an empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    let sorted = sorted(values);
    Some(if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    })
}

/// Nearest-rank percentile over sorted values: index `floor(p/100 * n)` clamped to `[0, n-1]`.
pub fn percentile(sorted_values: &[f64], p: f64) -> Option<f64> {
    let n = sorted_values.len();
    if n == 0 {
        return None;
    }
    let rank = ((p / 100.0) * n as f64).floor();
    let index = if rank <= 0.0 {
        0
    } else {
        (rank as usize).min(n - 1)
    };
    Some(sorted_values[index])
}

/// All values tied for the highest frequency, ascending.
pub fn mode(values: &[f64]) -> Vec<f64> {
    let mut frequency: HashMap<u64, (f64, usize)> = HashMap::new();
    for &v in values {
        // fold -0.0 into 0.0
        let v = if v == 0.0 { 0.0 } else { v };
        frequency.entry(v.to_bits()).or_insert((v, 0)).1 += 1;
    }
    let max_freq = frequency.values().map(|(_, c)| *c).max().unwrap_or(0);
    let modes: Vec<f64> = frequency
        .into_values()
        .filter(|(_, c)| *c == max_freq)
        .map(|(v, _)| v)
        .collect();
    sorted(&modes)
}

/// Handles descriptive statistics with multi-threading support across columns.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute descriptive statistics for a non-empty list of values.
    pub fn compute_descriptive_stats(column: &str, values: &[f64]) -> Result<StatsRecord> {
        let n = values.len();
        if n == 0 {
            return Err(AnalyticsError::InsufficientData {
                column: column.to_string(),
                required: 1,
                actual: 0,
            });
        }

        let sorted = sorted(values);
        let mean = values.mean();
        let median = median(values).unwrap_or(mean);
        let min = sorted[0];
        let max = sorted[n - 1];

        let variance = values.population_variance().max(0.0);
        let std_dev = variance.sqrt();

        let (skewness, kurtosis) = if std_dev > 0.0 {
            let moment = |k: i32| {
                values
                    .iter()
                    .map(|x| ((x - mean) / std_dev).powi(k))
                    .sum::<f64>()
                    / n as f64
            };
            (Some(moment(3)), Some(moment(4) - 3.0))
        } else {
            (None, None)
        };

        let p25 = percentile(&sorted, 25.0).unwrap_or(min);
        let p50 = percentile(&sorted, 50.0).unwrap_or(median);
        let p75 = percentile(&sorted, 75.0).unwrap_or(max);

        Ok(StatsRecord {
            column: column.to_string(),
            count: n,
            mean,
            median,
            mode: mode(values),
            min,
            max,
            range: max - min,
            variance,
            std_dev,
            iqr: p75 - p25,
            skewness,
            kurtosis,
            p25,
            p50,
            p75,
        })
    }

    /// Statistics for one column of a table.
    pub fn describe_column(table: &Table, index: usize) -> Result<StatsRecord> {
        let values = table.numeric_values(index);
        Self::compute_descriptive_stats(table.column_name(index), &values)
    }

    /// Statistics for every numeric column, computed in parallel, returned in column order.
    pub fn describe_table(table: &Table) -> Vec<StatsRecord> {
        let skipped = table.column_count() - table.numeric_columns().len();
        if skipped > 0 {
            warn!(skipped, "non-numeric columns excluded from descriptive statistics");
        }

        let records: Vec<StatsRecord> = table
            .numeric_columns()
            .par_iter()
            .filter_map(|&index| Self::describe_column(table, index).ok())
            .collect();

        info!(columns = records.len(), "descriptive statistics computed");
        records
    }
}

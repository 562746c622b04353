//! Regression & Correlation Module
//! Simple OLS line fitting and Pearson correlation over paired numeric columns.

use crate::data::Table;
use crate::error::{AnalyticsError, Result};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::info;

/// Rows where both columns hold a Number.
#[derive(Debug, Clone, PartialEq)]
pub struct PairedColumns {
    pub rows: Vec<usize>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl PairedColumns {
    pub fn from_table(table: &Table, x_col: usize, y_col: usize) -> Self {
        let mut paired = PairedColumns {
            rows: Vec::new(),
            x: Vec::new(),
            y: Vec::new(),
        };
        for (i, row) in table.rows().iter().enumerate() {
            let x = row.get(x_col).and_then(|c| c.as_number());
            let y = row.get(y_col).and_then(|c| c.as_number());
            if let (Some(x), Some(y)) = (x, y) {
                paired.rows.push(i);
                paired.x.push(x);
                paired.y.push(y);
            }
        }
        paired
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Centered sums over values divided by a power-of-two scale, so huge inputs
    /// cannot overflow the squares. Ratios of the sums are scale-free.
    fn moments(&self) -> Moments {
        let x_scale = scale_of(&self.x);
        let y_scale = scale_of(&self.y);
        let n = self.len() as f64;
        let x_mean = self.x.iter().map(|x| x / x_scale).sum::<f64>() / n;
        let y_mean = self.y.iter().map(|y| y / y_scale).sum::<f64>() / n;

        let mut m = Moments {
            sxy: 0.0,
            sxx: 0.0,
            syy: 0.0,
            x_mean,
            y_mean,
            x_scale,
            y_scale,
        };
        for (x, y) in self.x.iter().zip(&self.y) {
            let dx = x / x_scale - x_mean;
            let dy = y / y_scale - y_mean;
            m.sxy += dx * dy;
            m.sxx += dx * dx;
            m.syy += dy * dy;
        }
        m
    }

    fn require(&self, label: &str, required: usize) -> Result<()> {
        if self.len() < required {
            return Err(AnalyticsError::InsufficientData {
                column: label.to_string(),
                required,
                actual: self.len(),
            });
        }
        Ok(())
    }
}

/// Σ(x−x̄)(y−ȳ), Σ(x−x̄)², Σ(y−ȳ)² and the means, all in scaled units.
struct Moments {
    sxy: f64,
    sxx: f64,
    syy: f64,
    x_mean: f64,
    y_mean: f64,
    x_scale: f64,
    y_scale: f64,
}

/// Largest power of two not above max |v|; 1 for all-zero input.
fn scale_of(values: &[f64]) -> f64 {
    let max_abs = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if max_abs == 0.0 {
        return 1.0;
    }
    let scale = 2.0_f64.powi(max_abs.log2().floor() as i32);
    if scale.is_normal() {
        scale
    } else {
        1.0
    }
}

/// Fitted line `y = slope * x + intercept`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionResult {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// Row indices that contributed to the fit.
    pub rows: Vec<usize>,
}

impl RegressionResult {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Pearson correlation with a two-tailed significance test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationResult {
    pub r: f64,
    pub n: usize,
    /// `None` when fewer than three pairs are available.
    pub p_value: Option<f64>,
}

pub struct RegressionEngine;

impl RegressionEngine {
    pub fn fit(paired: &PairedColumns, label: &str) -> Result<RegressionResult> {
        paired.require(label, 2)?;
        let m = paired.moments();
        if m.sxx == 0.0 {
            return Err(AnalyticsError::DegenerateInput {
                reason: format!("all x values are equal in {label}"),
            });
        }

        let scaled_slope = m.sxy / m.sxx;
        let slope = scaled_slope * (m.y_scale / m.x_scale);
        let intercept = (m.y_mean - scaled_slope * m.x_mean) * m.y_scale;
        if !slope.is_finite() || !intercept.is_finite() {
            return Err(AnalyticsError::DegenerateInput {
                reason: format!("fitted line overflows in {label}"),
            });
        }
        let r_squared = if m.syy == 0.0 {
            1.0
        } else {
            (m.sxy / m.sxx * (m.sxy / m.syy)).min(1.0)
        };

        Ok(RegressionResult {
            slope,
            intercept,
            r_squared,
            rows: paired.rows.clone(),
        })
    }

    pub fn fit_columns(table: &Table, x_col: usize, y_col: usize) -> Result<RegressionResult> {
        let label = format!("{} ~ {}", table.column_name(y_col), table.column_name(x_col));
        let result = Self::fit(&PairedColumns::from_table(table, x_col, y_col), &label)?;
        info!(
            slope = result.slope,
            intercept = result.intercept,
            rows = result.rows.len(),
            "regression fitted"
        );
        Ok(result)
    }
}

pub struct CorrelationEngine;

impl CorrelationEngine {
    pub fn pearson(paired: &PairedColumns, label: &str) -> Result<CorrelationResult> {
        paired.require(label, 2)?;
        let m = paired.moments();
        if m.sxx == 0.0 || m.syy == 0.0 {
            return Err(AnalyticsError::DegenerateInput {
                reason: format!("zero variance in {label}"),
            });
        }

        let r = (m.sxy / (m.sxx.sqrt() * m.syy.sqrt())).clamp(-1.0, 1.0);
        let n = paired.len();
        Ok(CorrelationResult {
            r,
            n,
            p_value: Self::p_value(r, n),
        })
    }

    pub fn correlate_columns(
        table: &Table,
        x_col: usize,
        y_col: usize,
    ) -> Result<CorrelationResult> {
        let label = format!("{} / {}", table.column_name(x_col), table.column_name(y_col));
        let result = Self::pearson(&PairedColumns::from_table(table, x_col, y_col), &label)?;
        info!(r = result.r, n = result.n, "correlation computed");
        Ok(result)
    }

    /// Two-tailed p-value of `t = r·√((n−2)/(1−r²))` with n−2 degrees of freedom.
    fn p_value(r: f64, n: usize) -> Option<f64> {
        if n <= 2 {
            return None;
        }
        let df = (n - 2) as f64;
        let denom = 1.0 - r * r;
        if denom <= 0.0 {
            return Some(0.0);
        }
        let t = r * (df / denom).sqrt();
        StudentsT::new(0.0, 1.0, df)
            .ok()
            .map(|dist| (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0))
    }
}

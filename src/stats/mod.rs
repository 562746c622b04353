//! Stats module - descriptive statistics, regression, correlation and clustering

mod calculator;
mod clustering;
mod regression;

pub use calculator::{median, mode, percentile, sorted, StatsCalculator, StatsRecord};
pub use clustering::{
    ClusterAssignment, ClusteringEngine, ClusteringResult, FixedSampler, RandomSampler,
    RowSampler,
};
pub use regression::{
    CorrelationEngine, CorrelationResult, PairedColumns, RegressionEngine, RegressionResult,
};

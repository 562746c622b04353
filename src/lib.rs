//! Tabula - Tabular CSV Analytics Engine
//!
//! Parses delimited text into a typed table and runs a fixed menu of numeric
//! analyses on it: descriptive statistics, OLS regression, Pearson correlation,
//! cleaning, min-max normalization, log/sqrt transforms, IQR outlier filtering
//! and k-means clustering.
//!
//! ```
//! use tabula::data::TableParser;
//! use tabula::stats::StatsCalculator;
//!
//! let table = TableParser::new().parse("a,b\n1,2\n3,4\n5,6").unwrap();
//! let stats = StatsCalculator::describe_column(&table, 0).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! assert_eq!(stats.median, 3.0);
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod stats;

pub use error::{AnalyticsError, Result};

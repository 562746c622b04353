//! Error Module
//! Structured failures surfaced by every engine operation.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Malformed input at line {line}: {message}")]
    MalformedInput { line: usize, message: String },

    #[error("Unknown column '{identifier}' (valid columns: {})", valid.join(", "))]
    UnknownColumn {
        identifier: String,
        valid: Vec<String>,
    },

    #[error(
        "Insufficient data in '{column}': need at least {required} numeric values, got {actual}"
    )]
    InsufficientData {
        column: String,
        required: usize,
        actual: usize,
    },

    #[error("Degenerate input: {reason}")]
    DegenerateInput { reason: String },

    #[error("Column '{column}' has zero range")]
    DegenerateColumn { column: String },

    #[error("{transform} is undefined for value {value} in column '{column}' at row {row}")]
    Domain {
        column: String,
        row: usize,
        value: f64,
        transform: String,
    },

    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    #[error("Decision '{decision}' was cancelled")]
    Cancelled { decision: String },

    #[error("No data loaded")]
    NoData,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Delimited text error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl From<figment::Error> for AnalyticsError {
    fn from(e: figment::Error) -> Self {
        Self::Config(Box::new(e))
    }
}

impl AnalyticsError {
    pub(crate) fn invalid(name: &str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

//! Column Resolver Module
//! Maps a caller-supplied column identifier to a validated position.

use crate::error::{AnalyticsError, Result};

/// A resolved column: label plus zero-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub index: usize,
    pub name: String,
}

pub struct ColumnResolver;

impl ColumnResolver {
    /// Exact label match first, then a 1-based index in `[1, column count]`.
    pub fn resolve(header: &[String], identifier: &str) -> Result<ColumnRef> {
        if let Some(index) = header.iter().position(|h| h == identifier) {
            return Ok(ColumnRef {
                index,
                name: header[index].clone(),
            });
        }

        match identifier.trim().parse::<usize>() {
            Ok(n) if (1..=header.len()).contains(&n) => Ok(ColumnRef {
                index: n - 1,
                name: header[n - 1].clone(),
            }),
            _ => Err(AnalyticsError::UnknownColumn {
                identifier: identifier.to_string(),
                valid: header.to_vec(),
            }),
        }
    }
}

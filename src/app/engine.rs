//! Analysis Engine
//! Dispatches one operation against a session snapshot, asking the host for every choice.

use crate::config::KMeansSettings;
use crate::data::{
    CleaningPolicy, CleaningReport, ColumnRef, ColumnResolver, DataProcessor, OutlierReport,
    RowLimit, Session, Table, TransformKind,
};
use crate::error::{AnalyticsError, Result};
use crate::stats::{
    ClusteringEngine, ClusteringResult, CorrelationEngine, CorrelationResult, RandomSampler,
    RegressionEngine, RegressionResult, RowSampler, StatsCalculator, StatsRecord,
};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Operations offered to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Cleaning,
    Descriptive,
    Regression,
    Correlation,
    Normalize,
    Transform,
    Outlier,
    Clustering,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::Cleaning,
        Operation::Descriptive,
        Operation::Regression,
        Operation::Correlation,
        Operation::Normalize,
        Operation::Transform,
        Operation::Outlier,
        Operation::Clustering,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::Cleaning => "cleaning",
            Operation::Descriptive => "descriptive",
            Operation::Regression => "regression",
            Operation::Correlation => "correlation",
            Operation::Normalize => "normalize",
            Operation::Transform => "transform",
            Operation::Outlier => "outlier",
            Operation::Clustering => "clustering",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Operation::ALL.iter().map(|op| op.name()).collect();
                AnalyticsError::invalid(
                    "operation",
                    format!("expected one of {}, got '{s}'", names.join(" | ")),
                )
            })
    }
}

/// What the engine needs the host to decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DecisionKind {
    CleaningPolicy,
    Column,
    ClusterCount,
    TransformKind,
    KeepTable,
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DecisionKind::CleaningPolicy => "cleaning policy",
            DecisionKind::Column => "column",
            DecisionKind::ClusterCount => "cluster count",
            DecisionKind::TransformKind => "transform kind",
            DecisionKind::KeepTable => "keep table",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionRequest {
    pub kind: DecisionKind,
    pub prompt: String,
    /// Suggested answers; free-form answers are still validated by the engine.
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Chosen(String),
    /// The host dismissed the request; the operation aborts without side effects.
    Cancelled,
}

/// Host capability that answers decision requests (dialogs, prompts, scripts).
#[async_trait]
pub trait DecisionProvider: Send + Sync {
    async fn request_decision(&self, request: DecisionRequest) -> Decision;
}

/// Typed result handed to the rendering collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "operation", rename_all = "lowercase")]
pub enum OperationOutcome {
    Cleaning(CleaningReport),
    Descriptive { stats: Vec<StatsRecord> },
    Regression {
        x: String,
        y: String,
        #[serde(flatten)]
        result: RegressionResult,
    },
    Correlation {
        x: String,
        y: String,
        #[serde(flatten)]
        result: CorrelationResult,
    },
    Normalize { table: Table },
    Transform {
        column: String,
        transform: TransformKind,
        table: Table,
    },
    Outlier(OutlierReport),
    Clustering(ClusteringResult),
}

impl OperationOutcome {
    /// The new table, for table-producing operations.
    pub fn table(&self) -> Option<&Table> {
        match self {
            OperationOutcome::Cleaning(report) => Some(&report.table),
            OperationOutcome::Normalize { table } | OperationOutcome::Transform { table, .. } => {
                Some(table)
            }
            OperationOutcome::Outlier(report) => Some(&report.table),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisOutput {
    pub outcome: OperationOutcome,
    /// Whether the produced table replaced the session table.
    pub kept: bool,
}

/// Runs operations against a [`Session`], one at a time.
pub struct Analyzer<D: DecisionProvider> {
    decisions: D,
    kmeans: KMeansSettings,
    sampler: Box<dyn RowSampler + Send + Sync>,
}

impl<D: DecisionProvider> Analyzer<D> {
    pub fn new(decisions: D, kmeans: KMeansSettings) -> Self {
        let sampler = Box::new(RandomSampler::from_seed(kmeans.seed));
        Self {
            decisions,
            kmeans,
            sampler,
        }
    }

    /// Replace the centroid sampler (e.g. to pin initial rows).
    pub fn with_sampler(mut self, sampler: impl RowSampler + Send + Sync + 'static) -> Self {
        self.sampler = Box::new(sampler);
        self
    }

    pub fn decisions(&self) -> &D {
        &self.decisions
    }

    /// Run `op` on a fresh snapshot. The session table changes only when the host keeps the result.
    pub async fn run(
        &mut self,
        session: &mut Session,
        op: Operation,
        limit: RowLimit,
    ) -> Result<AnalysisOutput> {
        let table = session.snapshot(limit)?;
        debug!(operation = %op, rows = table.row_count(), "running operation");

        let outcome = match op {
            Operation::Cleaning => {
                let policy: CleaningPolicy = self
                    .ask(
                        DecisionKind::CleaningPolicy,
                        "Remove rows with missing values, or replace them with the column median?",
                        vec!["remove".into(), "replace".into()],
                    )
                    .await?
                    .parse()?;
                OperationOutcome::Cleaning(DataProcessor::clean(&table, policy))
            }
            Operation::Descriptive => {
                let stats = StatsCalculator::describe_table(&table);
                if stats.is_empty() {
                    return Err(AnalyticsError::InsufficientData {
                        column: "<numeric columns>".to_string(),
                        required: 1,
                        actual: 0,
                    });
                }
                OperationOutcome::Descriptive { stats }
            }
            Operation::Regression => {
                let x = self.ask_column(&table, "Independent variable (x):").await?;
                let y = self.ask_column(&table, "Dependent variable (y):").await?;
                let result = RegressionEngine::fit_columns(&table, x.index, y.index)?;
                OperationOutcome::Regression {
                    x: x.name,
                    y: y.name,
                    result,
                }
            }
            Operation::Correlation => {
                let x = self.ask_column(&table, "First column to correlate:").await?;
                let y = self.ask_column(&table, "Second column to correlate:").await?;
                let result = CorrelationEngine::correlate_columns(&table, x.index, y.index)?;
                OperationOutcome::Correlation {
                    x: x.name,
                    y: y.name,
                    result,
                }
            }
            Operation::Normalize => OperationOutcome::Normalize {
                table: DataProcessor::normalize(&table)?,
            },
            Operation::Transform => {
                let column = self.ask_column(&table, "Column to transform:").await?;
                let transform: TransformKind = self
                    .ask(
                        DecisionKind::TransformKind,
                        "Transform to apply:",
                        vec!["log".into(), "sqrt".into()],
                    )
                    .await?
                    .parse()?;
                OperationOutcome::Transform {
                    table: DataProcessor::transform(&table, column.index, transform)?,
                    column: column.name,
                    transform,
                }
            }
            Operation::Outlier => {
                let answer = self
                    .ask(
                        DecisionKind::Column,
                        "Column to check for outliers (blank = last column):",
                        table.header().to_vec(),
                    )
                    .await?;
                let column = match answer.trim() {
                    "" => None,
                    id => Some(ColumnResolver::resolve(table.header(), id)?.index),
                };
                OperationOutcome::Outlier(DataProcessor::filter_outliers(&table, column)?)
            }
            Operation::Clustering => {
                let answer = self
                    .ask(
                        DecisionKind::ClusterCount,
                        "Number of clusters (k):",
                        Vec::new(),
                    )
                    .await?;
                let k = answer.trim().parse::<usize>().map_err(|_| {
                    AnalyticsError::invalid(
                        "k",
                        format!("expected a positive integer, got '{answer}'"),
                    )
                })?;
                OperationOutcome::Clustering(ClusteringEngine::kmeans(
                    &table,
                    k,
                    &self.kmeans,
                    self.sampler.as_mut(),
                )?)
            }
        };

        let kept = match outcome.table() {
            Some(new_table) if self.confirm_keep(op).await? => {
                session.replace(new_table.clone());
                true
            }
            _ => false,
        };

        info!(operation = %op, kept, "operation complete");
        Ok(AnalysisOutput { outcome, kept })
    }

    async fn ask(&self, kind: DecisionKind, prompt: &str, options: Vec<String>) -> Result<String> {
        let request = DecisionRequest {
            kind,
            prompt: prompt.to_string(),
            options,
        };
        match self.decisions.request_decision(request).await {
            Decision::Chosen(answer) => Ok(answer),
            Decision::Cancelled => {
                info!(decision = %kind, "decision cancelled by host");
                Err(AnalyticsError::Cancelled {
                    decision: kind.to_string(),
                })
            }
        }
    }

    async fn ask_column(&self, table: &Table, prompt: &str) -> Result<ColumnRef> {
        let answer = self
            .ask(DecisionKind::Column, prompt, table.header().to_vec())
            .await?;
        ColumnResolver::resolve(table.header(), answer.trim())
    }

    async fn confirm_keep(&self, op: Operation) -> Result<bool> {
        let prompt = format!("Keep the {op} result as the current table?");
        let answer = self
            .ask(
                DecisionKind::KeepTable,
                &prompt,
                vec!["keep".into(), "discard".into()],
            )
            .await?;
        match answer.trim().to_ascii_lowercase().as_str() {
            "keep" | "yes" | "y" => Ok(true),
            "discard" | "no" | "n" => Ok(false),
            other => Err(AnalyticsError::invalid(
                "keep",
                format!("expected 'keep' or 'discard', got '{other}'"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_names_round_trip() {
        for op in Operation::ALL {
            assert_eq!(op.name().parse::<Operation>().unwrap(), op);
        }
        assert_eq!(" Outlier ".parse::<Operation>().unwrap(), Operation::Outlier);
        assert!(matches!(
            "plot".parse::<Operation>(),
            Err(AnalyticsError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn only_table_operations_expose_tables() {
        let table = crate::data::TableParser::new().parse("a\n1\n2").unwrap();
        let normalize = OperationOutcome::Normalize {
            table: table.clone(),
        };
        assert!(normalize.table().is_some());
        let stats = OperationOutcome::Descriptive { stats: Vec::new() };
        assert!(stats.table().is_none());
    }
}

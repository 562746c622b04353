//! App module - operation dispatch and host decision providers

mod engine;
mod prompt;

pub use engine::{
    AnalysisOutput, Analyzer, Decision, DecisionKind, DecisionProvider, DecisionRequest,
    Operation, OperationOutcome,
};
pub use prompt::{StdinPrompter, CANCEL_TOKEN};

//! Terminal Prompter
//! Answers decision requests from standard input; prompts are written to stderr.

use crate::app::engine::{Decision, DecisionProvider, DecisionRequest};
use async_trait::async_trait;
use tokio::io::{stdin, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

/// Typing this (or closing stdin) dismisses the request.
pub const CANCEL_TOKEN: &str = ":q";

pub struct StdinPrompter {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl Default for StdinPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl StdinPrompter {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(stdin()).lines()),
        }
    }
}

/// Map a raw answer line to a decision.
pub fn interpret(line: Option<String>) -> Decision {
    match line {
        Some(line) if line.trim() != CANCEL_TOKEN => Decision::Chosen(line.trim().to_string()),
        _ => Decision::Cancelled,
    }
}

#[async_trait]
impl DecisionProvider for StdinPrompter {
    async fn request_decision(&self, request: DecisionRequest) -> Decision {
        eprintln!("{}", request.prompt);
        if !request.options.is_empty() {
            eprintln!("  options: {}", request.options.join(", "));
        }
        eprint!("  ({CANCEL_TOKEN} to cancel) > ");

        let mut lines = self.lines.lock().await;
        match lines.next_line().await {
            Ok(line) => interpret(line),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read answer; cancelling");
                Decision::Cancelled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_are_trimmed_and_cancel_is_recognised() {
        assert_eq!(interpret(Some(" x ".into())), Decision::Chosen("x".into()));
        assert_eq!(interpret(Some(String::new())), Decision::Chosen(String::new()));
        assert_eq!(interpret(Some(" :q".into())), Decision::Cancelled);
        assert_eq!(interpret(None), Decision::Cancelled);
    }
}

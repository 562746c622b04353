//! Tabula - CSV Analytics from the command line
//!
//! Usage: `tabula <file.csv> <operation> [row-limit]`
//!
//! Choices the operation needs are prompted on stdin; the typed result is
//! printed to stdout as JSON. Settings come from `tabula.toml` and `TABULA_*`.

use anyhow::{bail, Context};
use std::path::PathBuf;
use tabula::app::{Analyzer, Operation, StdinPrompter};
use tabula::config::EngineConfig;
use tabula::data::{RowLimit, Session, TableParser};
use tracing_subscriber::EnvFilter;

fn usage() -> String {
    let ops: Vec<&str> = Operation::ALL.iter().map(|op| op.name()).collect();
    format!(
        "usage: tabula <file.csv> <operation> [row-limit]\n  operations: {}",
        ops.join(" | ")
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = EngineConfig::load().context("failed to load configuration")?;

    // RUST_LOG wins over the configured filter; logs go to stderr
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (path, op) = match args.as_slice() {
        [path, op, ..] => (PathBuf::from(path), op.parse::<Operation>()?),
        _ => bail!(usage()),
    };
    let limit = match args.get(2) {
        Some(raw) => RowLimit::parse(Some(raw)),
        None => RowLimit::from_config(config.row_limit),
    };

    let parser = TableParser::new()
        .delimiter(config.delimiter)
        .has_header(config.has_header);
    let mut session = Session::new(parser);
    session
        .load_file(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;

    let mut analyzer = Analyzer::new(StdinPrompter::new(), config.kmeans.clone());
    let output = analyzer.run(&mut session, op, limit).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    if let Some(export_path) = &config.export_path {
        std::fs::write(export_path, session.export()?)
            .with_context(|| format!("failed to export to {}", export_path.display()))?;
        let source = session.source().map(|p| p.display().to_string());
        tracing::info!(
            path = %export_path.display(),
            source = source.as_deref().unwrap_or("<memory>"),
            "table exported"
        );
    }

    Ok(())
}

//! CLI command handlers

use super::output::{format_chat, format_config, format_report};
use super::OutputFormat;
use crate::config::WorkwiseConfig;
use crate::conversation::ChatTurn;
use crate::error::{Result, WorkwiseError};
use crate::service::WorkflowAnalyzer;
use std::path::Path;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Read a JSON chat history file.
pub async fn read_history(path: &Path) -> Result<Vec<ChatTurn>> {
    let content = fs::read_to_string(path).await?;
    let turns: Vec<ChatTurn> = serde_json::from_str(&content)?;
    debug!(path = %path.display(), turns = turns.len(), "Loaded chat history");
    Ok(turns)
}

async fn optional_history(path: Option<&Path>) -> Result<Vec<ChatTurn>> {
    match path {
        Some(path) => read_history(path).await,
        None => Ok(Vec::new()),
    }
}

/// Handle `analyze`. Returns whether any steps were found.
pub async fn handle_analyze(
    config: &WorkwiseConfig,
    file: &Path,
    history: Option<&Path>,
    format: OutputFormat,
) -> Result<bool> {
    let document = fs::read_to_string(file).await?;
    if document.trim().is_empty() {
        return Err(WorkwiseError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} is empty", file.display()),
        )));
    }
    let history = optional_history(history).await?;
    let analyzer = WorkflowAnalyzer::from_config(config)?;

    info!(file = %file.display(), bytes = document.len(), "Analyzing workflow document");

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling analysis");
                cancel.cancel();
            }
        })
    };

    let report = analyzer.analyze_with_cancel(&document, &history, cancel).await;
    interrupt.abort();

    println!("{}", format_report(&report, format));
    Ok(report.is_success())
}

/// Handle `chat`.
pub async fn handle_chat(
    config: &WorkwiseConfig,
    message: String,
    history: Option<&Path>,
) -> Result<()> {
    let mut turns = optional_history(history).await?;
    turns.push(ChatTurn::user(message));

    let analyzer = WorkflowAnalyzer::from_config(config)?;
    let envelope = analyzer.chat(&turns).await;

    println!("{}", format_chat(&envelope));
    Ok(())
}

/// Handle `config`.
pub fn handle_config(config: &WorkwiseConfig) {
    print!("{}", format_config(config));
}

/// Handle `version`.
pub fn handle_version() {
    println!("{}", crate::version::full_version());
}

use super::{build_engine, load_agent};
use crate::config::Settings;
use crate::output::{write_reply, write_stream, OutputFormat, Transcript};
use agentic_chat_runtime::{
    normalize_history, Execution, InboundTurn, Message, NormalizePolicy, RunMode,
};
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A one-shot request from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub agent_path: PathBuf,
    pub message: String,
    /// JSON file with prior turns.
    pub history_path: Option<PathBuf>,
    pub format: OutputFormat,
    /// Overrides `Settings::stream` when set.
    pub stream: Option<bool>,
}

/// Read prior turns from a JSON array and normalize them.
///
/// Turns with unknown roles are dropped with a warning; any other malformed
/// turn fails the load.
pub fn load_history(path: &Path) -> Result<Vec<Message>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file {}", path.display()))?;
    let turns: Vec<Value> = serde_json::from_str(&content)
        .with_context(|| format!("History file {} is not a JSON array", path.display()))?;

    let normalized = normalize_history(
        turns.into_iter().map(InboundTurn::Loose),
        NormalizePolicy::Lenient,
    )?;
    if !normalized.dropped.is_empty() {
        warn!(
            "Dropped {} turn(s) from {}",
            normalized.dropped.len(),
            path.display()
        );
    }
    Ok(normalized.messages)
}

pub async fn run<W: Write>(settings: &Settings, request: &RunRequest, out: &mut W) -> Result<Transcript> {
    if request.message.trim().is_empty() {
        bail!("Message cannot be empty");
    }

    let definition = load_agent(&request.agent_path, settings)?;
    let mut history = match &request.history_path {
        Some(path) => load_history(path)?,
        None => Vec::new(),
    };
    history.push(Message::user(request.message.clone()));

    let mode = if request.stream.unwrap_or(settings.stream) {
        RunMode::Streaming
    } else {
        RunMode::Atomic
    };
    info!(
        "Agent '{}' on {} ({:?})",
        definition.config.name, definition.config.model, mode
    );

    let engine = build_engine(settings);
    match engine
        .execute(&definition.config, &definition.tools, history, mode)
        .await?
    {
        Execution::Atomic(output) => write_reply(output.reply, request.format, out),
        Execution::Streaming(fragments) => write_stream(fragments, request.format, out).await,
    }
}

//! Command-line parsing.

use crate::commands::run::RunRequest;
use crate::config::SettingsArgs;
use crate::output::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "agentic-chat",
    version,
    about = "Chat with YAML-defined agents served by Ollama",
    after_help = "Logs go to stderr, filtered by RUST_LOG (default warn).",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub settings: SettingsArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send one message to an agent and print the reply
    Run(RunArgs),
    /// Chat with an agent interactively
    Repl(ReplArgs),
    /// List models installed on the Ollama server
    Models,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RunArgs {
    /// Agent definition file
    #[arg(value_name = "AGENT_YAML")]
    pub agent: PathBuf,

    /// Message text; separate words are joined with spaces
    #[arg(required = true, num_args = 1..)]
    pub message: Vec<String>,

    /// JSON array of prior turns
    #[arg(long, value_name = "TURNS_JSON")]
    pub history: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[command(flatten)]
    pub stream: StreamArgs,
}

impl RunArgs {
    pub fn into_request(self) -> RunRequest {
        RunRequest {
            agent_path: self.agent,
            message: self.message.join(" "),
            history_path: self.history,
            format: self.format,
            stream: self.stream.choice(),
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ReplArgs {
    /// Agent definition file
    #[arg(value_name = "AGENT_YAML")]
    pub agent: PathBuf,

    #[command(flatten)]
    pub stream: StreamArgs,
}

/// Per-command override of the streaming default.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamArgs {
    /// Stream the reply as it is produced
    #[arg(long, overrides_with = "no_stream")]
    pub stream: bool,

    /// Print the reply in one piece
    #[arg(long, overrides_with = "stream")]
    pub no_stream: bool,
}

impl StreamArgs {
    pub fn choice(&self) -> Option<bool> {
        match (self.stream, self.no_stream) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

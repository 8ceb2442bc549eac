use agentic_chat_runtime::{EngineOptions, OllamaFactory};
use anyhow::{bail, Result};
use clap::Args;
use std::time::Duration;

pub use agentic_chat_runtime::agent_config::DEFAULT_MODEL;
pub use agentic_chat_runtime::llm_client::DEFAULT_BASE_URL;

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_STEPS: usize = 8;
pub const DEFAULT_METRICS_ADDR: &str = "127.0.0.1:9091";

/// Process-wide options. Each falls back to its environment variable, then
/// to the built-in default.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsArgs {
    /// Ollama server
    #[arg(long, global = true, env = "OLLAMA_BASE_URL", value_name = "URL")]
    pub base_url: Option<String>,

    /// Model for agent files that name none
    #[arg(long, global = true, env = "OLLAMA_MODEL")]
    pub model: Option<String>,

    /// Per-request deadline in seconds
    #[arg(
        long = "timeout",
        global = true,
        env = "AGENTIC_CHAT_REQUEST_TIMEOUT_SECS",
        value_name = "SECS"
    )]
    pub timeout_secs: Option<u64>,

    /// Step budget per run
    #[arg(long, global = true, env = "AGENTIC_CHAT_MAX_STEPS", value_name = "STEPS")]
    pub max_steps: Option<usize>,

    /// Stream replies unless a command says otherwise
    #[arg(
        long,
        global = true,
        env = "AGENTIC_CHAT_STREAM",
        value_name = "BOOL",
        value_parser = parse_flag
    )]
    pub stream_default: Option<bool>,

    /// Prometheus exporter listen address, when built with it
    #[arg(long, global = true, env = "AGENTIC_CHAT_METRICS_ADDR", value_name = "ADDR")]
    pub metrics_addr: Option<String>,
}

/// Resolved process settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: String,
    /// Model for agent files that do not name one.
    pub default_model: String,
    pub request_timeout: Duration,
    pub max_steps: usize,
    pub stream: bool,
    pub metrics_addr: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_steps: DEFAULT_MAX_STEPS,
            stream: true,
            metrics_addr: DEFAULT_METRICS_ADDR.to_string(),
        }
    }
}

impl Settings {
    /// Apply parsed options over the defaults. Blank strings keep defaults.
    pub fn from_args(args: SettingsArgs) -> Result<Self> {
        let present = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut settings = Self::default();

        if let Some(url) = present(args.base_url) {
            settings.base_url = url;
        }
        if let Some(model) = present(args.model) {
            settings.default_model = model;
        }
        if let Some(secs) = args.timeout_secs {
            settings.request_timeout = Duration::from_secs(secs);
        }
        if let Some(steps) = args.max_steps {
            settings.max_steps = steps;
        }
        if let Some(stream) = args.stream_default {
            settings.stream = stream;
        }
        if let Some(addr) = present(args.metrics_addr) {
            settings.metrics_addr = addr;
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            bail!("OLLAMA_BASE_URL must start with http:// or https://");
        }
        if self.request_timeout.is_zero() {
            bail!("AGENTIC_CHAT_REQUEST_TIMEOUT_SECS must be greater than zero");
        }
        if self.max_steps == 0 {
            bail!("AGENTIC_CHAT_MAX_STEPS must be greater than zero");
        }
        Ok(())
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            max_steps: self.max_steps,
            invoke_timeout: self.request_timeout,
            ..EngineOptions::default()
        }
    }

    pub fn factory(&self) -> OllamaFactory {
        OllamaFactory::new(self.base_url.clone(), self.request_timeout)
    }
}

fn parse_flag(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("expected true or false, got '{}'", other)),
    }
}

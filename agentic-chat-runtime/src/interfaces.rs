//! Abstract interfaces for runtime dependencies.

use crate::types::{ConversationState, Message, ToolDescriptor};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Runtime errors.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("LLM error: {0}")]
    LLMError(String),

    #[error("Tool error: {0}")]
    ToolError(String),

    #[error("Input error: {0}")]
    InputError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A configured inference client bound to one (model, temperature) pair.
///
/// Implementations hold no per-conversation state and may be invoked
/// concurrently from independent runs.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Generate the next assistant reply for the given conversation.
    async fn invoke(&self, messages: &[Message]) -> Result<String, RuntimeError>;
}

/// Constructs backend handles for the client cache.
pub trait BackendFactory: Send + Sync {
    /// Build a new handle. Called at most once per cached key.
    fn connect(&self, model: &str, temperature: f32)
        -> Result<Arc<dyn ChatBackend>, RuntimeError>;
}

/// Tool execution seam used by the tool-runner node.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute whatever the last assistant turn requested and return the
    /// turns to append.
    async fn execute(
        &self,
        state: &ConversationState,
        tools: &[ToolDescriptor],
    ) -> Result<Vec<Message>, RuntimeError>;
}

/// Executor for agents without tool support. Appends nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopToolExecutor;

#[async_trait]
impl ToolExecutor for NoopToolExecutor {
    async fn execute(
        &self,
        _state: &ConversationState,
        _tools: &[ToolDescriptor],
    ) -> Result<Vec<Message>, RuntimeError> {
        Ok(Vec::new())
    }
}

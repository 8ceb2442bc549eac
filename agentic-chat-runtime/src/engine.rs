//! Execution engine - compiles and drives the graph for one request.

use crate::agent_config::AgentConfig;
use crate::chunking::ChunkPolicy;
use crate::client_cache::ClientCache;
use crate::graph::{CompiledGraph, GraphRun, Termination};
use crate::interfaces::{NoopToolExecutor, RuntimeError, ToolExecutor};
use crate::routing::{NoToolsPolicy, RoutingPolicy};
use crate::types::{ConversationState, Failure, FailureKind, Message, Role, ToolDescriptor};
use async_stream::stream;
use futures::stream::BoxStream;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Returned in atomic mode when the run produced no assistant content.
pub const NO_RESPONSE: &str = "No response generated";

pub const DEFAULT_MAX_STEPS: usize = 8;
pub const DEFAULT_INVOKE_TIMEOUT: Duration = Duration::from_secs(120);

/// Tunables shared by every run of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Maximum responder invocations per run.
    pub max_steps: usize,
    /// Deadline for a single backend invocation.
    pub invoke_timeout: Duration,
    pub chunking: ChunkPolicy,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            invoke_timeout: DEFAULT_INVOKE_TIMEOUT,
            chunking: ChunkPolicy::default(),
        }
    }
}

/// How the caller wants output delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Atomic,
    Streaming,
}

/// Final reply of an atomic run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Content(String),
    NoResponse,
    Failed(Failure),
}

impl Reply {
    /// Render as a displayable string.
    pub fn into_text(self) -> String {
        match self {
            Reply::Content(content) => content,
            Reply::NoResponse => NO_RESPONSE.to_string(),
            Reply::Failed(failure) => failure.render(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Reply::Failed(_))
    }
}

/// Result of an atomic run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub reply: Reply,
    pub state: ConversationState,
    /// `None` when the run was cut short by a graph failure.
    pub termination: Option<Termination>,
}

impl RunOutput {
    pub fn text(&self) -> String {
        self.reply.clone().into_text()
    }
}

/// One element of a streamed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text(String),
    /// A piece of a rendered failure. Concatenating the pieces of one
    /// failure gives [`Failure::render`].
    Error { kind: FailureKind, text: String },
}

impl Fragment {
    /// The whole failure as a single fragment.
    pub fn failure(failure: &Failure) -> Self {
        Fragment::Error {
            kind: failure.kind,
            text: failure.render(),
        }
    }

    /// Text as the reference transport would send it.
    pub fn render(&self) -> String {
        match self {
            Fragment::Text(text) | Fragment::Error { text, .. } => text.clone(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Fragment::Error { .. })
    }
}

/// Lazy, finite, non-restartable sequence of fragments.
pub type FragmentStream = BoxStream<'static, Fragment>;

/// Output of [`Engine::execute`].
pub enum Execution {
    Atomic(RunOutput),
    Streaming(FragmentStream),
}

/// Drives agent runs against a shared client cache.
pub struct Engine {
    cache: Arc<ClientCache>,
    policy: Arc<dyn RoutingPolicy>,
    executor: Arc<dyn ToolExecutor>,
    options: EngineOptions,
}

impl Engine {
    /// Create an engine with the no-tools policy and executor.
    pub fn new(cache: Arc<ClientCache>) -> Self {
        Self {
            cache,
            policy: Arc::new(NoToolsPolicy),
            executor: Arc::new(NoopToolExecutor),
            options: EngineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_routing_policy(mut self, policy: Arc<dyn RoutingPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_tool_executor(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn cache(&self) -> &Arc<ClientCache> {
        &self.cache
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Build a fresh graph for one run.
    ///
    /// # Errors
    /// Returns `ConfigError` for an invalid agent; no backend is touched.
    pub fn compile(
        &self,
        agent: &AgentConfig,
        tools: &[ToolDescriptor],
    ) -> Result<CompiledGraph, RuntimeError> {
        let params = agent.validate().map_err(|e| {
            error!("Rejecting run for agent '{}': {}", agent.name, e);
            e
        })?;

        Ok(CompiledGraph {
            params,
            tools: tools.to_vec(),
            cache: self.cache.clone(),
            policy: self.policy.clone(),
            executor: self.executor.clone(),
            max_steps: self.options.max_steps,
            invoke_timeout: self.options.invoke_timeout,
        })
    }

    /// Run in the requested mode.
    pub async fn execute(
        &self,
        agent: &AgentConfig,
        tools: &[ToolDescriptor],
        history: Vec<Message>,
        mode: RunMode,
    ) -> Result<Execution, RuntimeError> {
        match mode {
            RunMode::Atomic => Ok(Execution::Atomic(self.run(agent, tools, history).await?)),
            RunMode::Streaming => Ok(Execution::Streaming(self.stream(agent, tools, history)?)),
        }
    }

    /// Drive the graph to completion and return the final reply.
    ///
    /// # Errors
    /// Only configuration errors are returned; everything else is reported
    /// in-band through [`Reply`].
    pub async fn run(
        &self,
        agent: &AgentConfig,
        tools: &[ToolDescriptor],
        history: Vec<Message>,
    ) -> Result<RunOutput, RuntimeError> {
        let graph = self.compile(agent, tools)?;
        info!(
            "Running agent '{}' ({} turns, {} tools)",
            agent.name,
            history.len(),
            tools.len()
        );
        crate::metrics::increment_runs();
        let _timer = crate::metrics::MetricTimer::new("run_duration");

        let mut run = graph.start(history);
        let mut last_reply: Option<Message> = None;
        let mut drive_error = None;

        while let Some(step) = run.step().await {
            match step {
                Ok(output) => {
                    debug!("Node {:?} appended {} turns", output.node, output.appended.len());
                    if let Some(reply) = output
                        .appended
                        .into_iter()
                        .rev()
                        .find(|m| m.role == Role::Assistant)
                    {
                        last_reply = Some(reply);
                    }
                }
                Err(e) => {
                    drive_error = Some(e);
                    break;
                }
            }
        }

        let termination = run.termination();
        let reply = match (drive_error, last_reply) {
            (Some(e), _) => {
                error!("Execution error for agent '{}': {}", agent.name, e);
                crate::metrics::increment_graph_failures();
                Reply::Failed(Failure::graph(e.to_string()))
            }
            (None, Some(Message { failure: Some(failure), .. })) => Reply::Failed(failure),
            (None, Some(message)) if !message.content.is_empty() => Reply::Content(message.content),
            (None, _) => Reply::NoResponse,
        };

        info!("Run for agent '{}' finished: {:?}", agent.name, termination);
        Ok(RunOutput {
            reply,
            state: run.into_state(),
            termination,
        })
    }

    /// Start a streamed run.
    ///
    /// Every turn appended by a node is emitted as it is produced, split
    /// according to the chunk policy; failure turns are split the same way
    /// into error fragments. Empty turns emit nothing. A graph failure is
    /// emitted as a single error fragment and ends the stream.
    ///
    /// # Errors
    /// Configuration errors are returned before any fragment is produced.
    pub fn stream(
        &self,
        agent: &AgentConfig,
        tools: &[ToolDescriptor],
        history: Vec<Message>,
    ) -> Result<FragmentStream, RuntimeError> {
        let graph = self.compile(agent, tools)?;
        info!(
            "Streaming agent '{}' ({} turns, {} tools)",
            agent.name,
            history.len(),
            tools.len()
        );
        crate::metrics::increment_runs();

        let chunking = self.options.chunking;
        let agent_name = agent.name.clone();
        let mut run: GraphRun = graph.start(history);

        Ok(Box::pin(stream! {
            while let Some(step) = run.step().await {
                match step {
                    Ok(output) => {
                        for message in output.appended {
                            let kind = message.failure.as_ref().map(|f| f.kind);
                            for piece in chunking.split(&message.content) {
                                yield match kind {
                                    Some(kind) => Fragment::Error { kind, text: piece },
                                    None => Fragment::Text(piece),
                                };
                            }
                        }
                    }
                    Err(e) => {
                        error!("Streaming error for agent '{}': {}", agent_name, e);
                        crate::metrics::increment_graph_failures();
                        yield Fragment::failure(&Failure::graph(e.to_string()));
                        break;
                    }
                }
            }
            debug!("Stream for agent '{}' finished: {:?}", agent_name, run.termination());
        }))
    }
}

//! Two-node execution graph for one orchestration turn.
//!
//! ```text
//!            +-----------+   Continue   +-------------+
//! entry ---> | Responder | -----------> | Tool-Runner |
//!            +-----------+ <----------- +-------------+
//!                  | Terminate
//!                  v
//!                 END
//! ```

use crate::agent_config::RunParams;
use crate::client_cache::ClientCache;
use crate::interfaces::{RuntimeError, ToolExecutor};
use crate::routing::{Route, RoutingPolicy};
use crate::types::{ConversationState, Failure, Message, Role, ToolDescriptor};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Appended to the agent's system prompt before every model invocation.
pub const PROMPT_SUFFIX: &str = "Based on the above instructions, answer the user's questions below.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeId {
    Responder,
    ToolRunner,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The routing policy chose to stop.
    Completed,
    /// The policy wanted to continue but the step budget ran out.
    BudgetExhausted,
}

/// Turns one node appended to the state.
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub node: NodeId,
    pub appended: Vec<Message>,
}

/// Build the model input: history with the enhanced system prompt first.
///
/// A leading system turn is replaced rather than duplicated, so preparing an
/// already-prepared history is a no-op.
pub fn prepare_prompt(system_prompt: &str, history: &[Message]) -> Vec<Message> {
    let enhanced = Message::system(format!("{}\n\n{}", system_prompt, PROMPT_SUFFIX));
    let rest = match history.first() {
        Some(first) if first.role == Role::System => &history[1..],
        _ => history,
    };

    let mut prompt = Vec::with_capacity(rest.len() + 1);
    prompt.push(enhanced);
    prompt.extend_from_slice(rest);
    prompt
}

/// A graph bound to one agent and tool catalog. Built fresh per run.
///
/// Holds topology and collaborators only; all mutable state lives in the
/// [`GraphRun`].
pub struct CompiledGraph {
    pub(crate) params: RunParams,
    pub(crate) tools: Vec<ToolDescriptor>,
    pub(crate) cache: Arc<ClientCache>,
    pub(crate) policy: Arc<dyn RoutingPolicy>,
    pub(crate) executor: Arc<dyn ToolExecutor>,
    pub(crate) max_steps: usize,
    pub(crate) invoke_timeout: Duration,
}

impl CompiledGraph {
    pub const ENTRY: NodeId = NodeId::Responder;

    /// Seed a run with the given history.
    pub fn start(self, history: Vec<Message>) -> GraphRun {
        GraphRun {
            graph: self,
            state: ConversationState::new(history),
            cursor: Some(Self::ENTRY),
            responder_steps: 0,
            termination: None,
        }
    }

    pub fn params(&self) -> &RunParams {
        &self.params
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Responder node body. Backend failures become an assistant turn.
    async fn respond(&self, state: &ConversationState) -> Message {
        let prompt = prepare_prompt(&self.params.system_prompt, state.messages());

        match self.invoke(&prompt).await {
            Ok(content) => Message::assistant(content),
            Err(e) => {
                error!("Responder failed for model {}: {}", self.params.model, e);
                crate::metrics::increment_backend_failures();
                Message::from_failure(Failure::backend(e.to_string()))
            }
        }
    }

    async fn invoke(&self, prompt: &[Message]) -> Result<String, RuntimeError> {
        let client = self
            .cache
            .get_client(&self.params.model, self.params.temperature)?;

        let _timer = crate::metrics::MetricTimer::new("backend_invoke_latency");
        match tokio::time::timeout(self.invoke_timeout, client.invoke(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(RuntimeError::LLMError(format!(
                "Model invocation timed out after {:?}",
                self.invoke_timeout
            ))),
        }
    }
}

/// One in-flight execution of a compiled graph.
pub struct GraphRun {
    graph: CompiledGraph,
    state: ConversationState,
    cursor: Option<NodeId>,
    responder_steps: usize,
    termination: Option<Termination>,
}

impl GraphRun {
    /// Execute the current node and follow its outgoing edge.
    ///
    /// Returns `None` once a terminal transition has been taken or a
    /// previous step failed.
    pub async fn step(&mut self) -> Option<Result<StepOutput, RuntimeError>> {
        let node = self.cursor?;
        debug!("Executing node {:?}", node);

        let output = match node {
            NodeId::Responder => {
                self.responder_steps += 1;
                Ok(vec![self.graph.respond(&self.state).await])
            }
            NodeId::ToolRunner => {
                self.graph
                    .executor
                    .execute(&self.state, &self.graph.tools)
                    .await
            }
        };

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                self.cursor = None;
                return Some(Err(e));
            }
        };
        let appended = self.state.extend(output).to_vec();

        self.cursor = match node {
            NodeId::Responder => self.route(),
            NodeId::ToolRunner => Some(NodeId::Responder),
        };

        Some(Ok(StepOutput { node, appended }))
    }

    /// Conditional edge out of the responder.
    fn route(&mut self) -> Option<NodeId> {
        match self.graph.policy.decide(&self.state) {
            Route::Terminate => {
                self.termination = Some(Termination::Completed);
                None
            }
            Route::Continue if self.responder_steps >= self.graph.max_steps => {
                warn!(
                    "Step budget of {} exhausted, ending run",
                    self.graph.max_steps
                );
                self.termination = Some(Termination::BudgetExhausted);
                None
            }
            Route::Continue => Some(NodeId::ToolRunner),
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Set once a terminal transition has been taken.
    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    pub fn into_state(self) -> ConversationState {
        self.state
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::interfaces::{BackendFactory, ChatBackend, NoopToolExecutor};
    use crate::routing::NoToolsPolicy;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct RecordingBackend {
        seen: Mutex<Vec<Vec<Message>>>,
    }

    #[async_trait]
    impl ChatBackend for RecordingBackend {
        async fn invoke(&self, messages: &[Message]) -> Result<String, RuntimeError> {
            self.seen.lock().push(messages.to_vec());
            Ok(format!("reply {}", self.seen.lock().len()))
        }
    }

    struct SharedFactory(Arc<RecordingBackend>);

    impl BackendFactory for SharedFactory {
        fn connect(&self, _: &str, _: f32) -> Result<Arc<dyn ChatBackend>, RuntimeError> {
            Ok(self.0.clone())
        }
    }

    struct FailingExecutor;

    #[async_trait]
    impl ToolExecutor for FailingExecutor {
        async fn execute(
            &self,
            _state: &ConversationState,
            _tools: &[ToolDescriptor],
        ) -> Result<Vec<Message>, RuntimeError> {
            Err(RuntimeError::ToolError("tool crashed".to_string()))
        }
    }

    fn graph(
        backend: Arc<RecordingBackend>,
        policy: Arc<dyn RoutingPolicy>,
        executor: Arc<dyn ToolExecutor>,
    ) -> CompiledGraph {
        CompiledGraph {
            params: RunParams {
                model: "llama3.2".to_string(),
                temperature: 0.7,
                system_prompt: "Be kind.".to_string(),
            },
            tools: Vec::new(),
            cache: Arc::new(ClientCache::new(Arc::new(SharedFactory(backend)))),
            policy,
            executor,
            max_steps: 3,
            invoke_timeout: Duration::from_secs(5),
        }
    }

    fn backend() -> Arc<RecordingBackend> {
        Arc::new(RecordingBackend {
            seen: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn test_prepare_prompt_injects_system_turn() {
        let prompt = prepare_prompt("Be kind.", &[]);
        assert_eq!(prompt.len(), 1);
        assert_eq!(prompt[0].role, Role::System);
        assert!(prompt[0].content.starts_with("Be kind.\n\n"));
        assert!(prompt[0].content.ends_with(PROMPT_SUFFIX));
    }

    #[test]
    fn test_prepare_prompt_is_idempotent() {
        let history = vec![Message::system("stale"), Message::user("hi")];
        let once = prepare_prompt("Be kind.", &history);
        let twice = prepare_prompt("Be kind.", &once);
        assert_eq!(once, twice);
        assert_eq!(
            twice.iter().filter(|m| m.role == Role::System).count(),
            1
        );
        assert_eq!(twice[1], Message::user("hi"));
    }

    #[tokio::test]
    async fn test_single_step_with_terminating_policy() {
        let backend = backend();
        let mut run = graph(backend.clone(), Arc::new(NoToolsPolicy), Arc::new(NoopToolExecutor))
            .start(vec![Message::user("hi")]);

        let step = run.step().await.unwrap().unwrap();
        assert_eq!(step.node, NodeId::Responder);
        assert_eq!(step.appended, vec![Message::assistant("reply 1")]);
        assert!(run.step().await.is_none());
        assert_eq!(run.termination(), Some(Termination::Completed));
        assert_eq!(run.state().len(), 2);
    }

    #[tokio::test]
    async fn test_loop_stops_at_step_budget() {
        let backend = backend();
        let always = |_: &ConversationState| Route::Continue;
        let mut run = graph(backend.clone(), Arc::new(always), Arc::new(NoopToolExecutor))
            .start(vec![Message::user("hi")]);

        let mut nodes = Vec::new();
        while let Some(step) = run.step().await {
            nodes.push(step.unwrap().node);
        }

        assert_eq!(
            nodes,
            vec![
                NodeId::Responder,
                NodeId::ToolRunner,
                NodeId::Responder,
                NodeId::ToolRunner,
                NodeId::Responder,
            ]
        );
        assert_eq!(run.termination(), Some(Termination::BudgetExhausted));
        assert_eq!(backend.seen.lock().len(), 3);
    }

    #[tokio::test]
    async fn test_tool_runner_failure_ends_run() {
        let backend = backend();
        let always = |_: &ConversationState| Route::Continue;
        let mut run = graph(backend, Arc::new(always), Arc::new(FailingExecutor))
            .start(Vec::new());

        assert!(run.step().await.unwrap().is_ok());
        match run.step().await {
            Some(Err(RuntimeError::ToolError(msg))) => assert_eq!(msg, "tool crashed"),
            other => panic!("Expected ToolError, got {:?}", other.map(|r| r.is_ok())),
        }
        assert!(run.step().await.is_none());
        assert!(run.termination().is_none());
    }

    #[tokio::test]
    async fn test_responder_sees_prepared_prompt_not_state() {
        let backend = backend();
        let mut run = graph(backend.clone(), Arc::new(NoToolsPolicy), Arc::new(NoopToolExecutor))
            .start(Vec::new());
        run.step().await.unwrap().unwrap();

        let seen = backend.seen.lock();
        assert_eq!(seen[0].len(), 1);
        assert_eq!(seen[0][0].role, Role::System);
        // the injected system turn is model input only
        assert_eq!(run.state().messages(), &[Message::assistant("reply 1")]);
    }
}

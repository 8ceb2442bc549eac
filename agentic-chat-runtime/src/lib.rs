//! Agentic Chat Runtime
//!
//! Executes one conversational turn of a configured agent against a language
//! model backend, either collecting the reply or streaming it in fragments.

pub mod types;
pub mod interfaces;
pub mod normalize;
pub mod agent_config;
pub mod client_cache;
pub mod llm_client;
pub mod routing;
pub mod chunking;
pub mod graph;
pub mod engine;
pub mod render;
pub mod metrics;

pub use types::{ConversationState, Failure, FailureKind, Message, Role, ToolDescriptor};
pub use interfaces::{BackendFactory, ChatBackend, NoopToolExecutor, RuntimeError, ToolExecutor};
pub use normalize::{normalize_history, parse_turn, InboundTurn, NormalizePolicy, NormalizedHistory, TurnRejection};
pub use agent_config::{load_agent_config, load_agent_config_with_model, AgentConfig, AgentDefinition, RunParams};
pub use client_cache::ClientCache;
pub use llm_client::{OllamaClient, OllamaFactory};
pub use routing::{NoToolsPolicy, Route, RoutingPolicy};
pub use chunking::ChunkPolicy;
pub use graph::{prepare_prompt, CompiledGraph, GraphRun, NodeId, StepOutput, Termination};
pub use engine::{Engine, EngineOptions, Execution, Fragment, FragmentStream, Reply, RunMode, RunOutput, NO_RESPONSE};
pub use render::{FragmentRenderer, SseRenderer, TextRenderer, WsRenderer};

pub mod models;
pub mod run;

use crate::config::Settings;
use agentic_chat_runtime::{load_agent_config_with_model, AgentDefinition, ClientCache, Engine};
use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::Arc;

/// Load an agent definition and refuse inactive agents.
pub fn load_agent(path: &Path, settings: &Settings) -> Result<AgentDefinition> {
    let definition = load_agent_config_with_model(path, &settings.default_model)
        .with_context(|| format!("Failed to load agent from {}", path.display()))?;

    if !definition.config.is_active {
        bail!("Agent '{}' is not active", definition.config.name);
    }
    Ok(definition)
}

/// One engine per process, backed by a shared client cache.
pub fn build_engine(settings: &Settings) -> Engine {
    let cache = ClientCache::new(Arc::new(settings.factory()));
    Engine::new(Arc::new(cache)).with_options(settings.engine_options())
}

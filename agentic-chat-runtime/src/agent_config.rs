//! Agent configuration and loader.

use crate::interfaces::RuntimeError;
use crate::types::ToolDescriptor;
use serde::{Deserialize, Deserializer};
use std::path::Path;

pub const DEFAULT_MODEL: &str = "llama3.2";
pub const DEFAULT_TEMPERATURE: &str = "0.7";

/// Agent configuration as stored by the persistence layer.
///
/// `is_active` is checked by callers before a run; the engine never looks at it.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AgentConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub system_prompt: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Numeric value kept as text, as persisted.
    #[serde(default = "default_temperature", deserialize_with = "temperature_text")]
    pub temperature: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> String {
    DEFAULT_TEMPERATURE.to_string()
}

fn default_active() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TemperatureText {
    Text(String),
    Number(f64),
}

/// Accept `temperature: 0.7` as well as `temperature: "0.7"`.
fn temperature_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match TemperatureText::deserialize(deserializer)? {
        TemperatureText::Text(text) => text,
        TemperatureText::Number(value) => value.to_string(),
    })
}

/// Validated, parsed view of an agent used for a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunParams {
    pub model: String,
    pub temperature: f32,
    pub system_prompt: String,
}

impl AgentConfig {
    /// Parse the textual temperature.
    pub fn parsed_temperature(&self) -> Result<f32, RuntimeError> {
        let trimmed = self.temperature.trim();
        let value: f32 = trimmed.parse().map_err(|_| {
            RuntimeError::ConfigError(format!(
                "Agent '{}' has invalid temperature: '{}'",
                self.name, self.temperature
            ))
        })?;
        if !value.is_finite() {
            return Err(RuntimeError::ConfigError(format!(
                "Agent '{}' has non-finite temperature: '{}'",
                self.name, self.temperature
            )));
        }
        Ok(value)
    }

    /// Validate required fields and parse numeric settings.
    ///
    /// # Errors
    /// Returns `ConfigError` if the model or system prompt is blank or the
    /// temperature does not parse.
    pub fn validate(&self) -> Result<RunParams, RuntimeError> {
        if self.model.trim().is_empty() {
            return Err(RuntimeError::ConfigError(format!(
                "Agent '{}' missing required field: model",
                self.name
            )));
        }
        if self.system_prompt.trim().is_empty() {
            return Err(RuntimeError::ConfigError(format!(
                "Agent '{}' missing required field: system_prompt",
                self.name
            )));
        }
        let temperature = self.parsed_temperature()?;

        Ok(RunParams {
            model: self.model.trim().to_string(),
            temperature,
            system_prompt: self.system_prompt.clone(),
        })
    }
}

/// Agent definition file: the agent plus its tool catalog.
#[derive(Debug, Clone)]
pub struct AgentDefinition {
    pub config: AgentConfig,
    pub tools: Vec<ToolDescriptor>,
}

/// Raw structure from YAML.
#[derive(Debug, Deserialize)]
struct RawDefinition {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default)]
    system_prompt_file: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default = "default_temperature", deserialize_with = "temperature_text")]
    temperature: String,
    #[serde(default = "default_active")]
    is_active: bool,
    #[serde(default)]
    tools: Vec<ToolDescriptor>,
}

/// Load an agent definition from a YAML file.
///
/// # Arguments
/// * `config_path` - Path to agent YAML file
///
/// # Returns
/// AgentDefinition with the system prompt resolved, either inline or from
/// `system_prompt_file` relative to the YAML file
///
/// # Errors
/// Returns error if a file is missing or the definition is invalid
pub fn load_agent_config(config_path: impl AsRef<Path>) -> Result<AgentDefinition, RuntimeError> {
    load_agent_config_with_model(config_path, DEFAULT_MODEL)
}

/// Like [`load_agent_config`], with `default_model` used when the file names
/// no model.
pub fn load_agent_config_with_model(
    config_path: impl AsRef<Path>,
    default_model: &str,
) -> Result<AgentDefinition, RuntimeError> {
    let config_file = config_path.as_ref();

    if !config_file.exists() {
        return Err(RuntimeError::ConfigError(format!(
            "Config file not found: {}",
            config_file.display()
        )));
    }

    let content = std::fs::read_to_string(config_file)?;

    if content.trim().is_empty() {
        return Err(RuntimeError::ConfigError("Config file is empty".to_string()));
    }

    let raw: RawDefinition = serde_yaml::from_str(&content)
        .map_err(|e| RuntimeError::ConfigError(format!("Invalid YAML: {}", e)))?;

    if raw.name.trim().is_empty() {
        return Err(RuntimeError::ConfigError(
            "Config missing required field: name".to_string(),
        ));
    }

    let system_prompt = match (raw.system_prompt, raw.system_prompt_file) {
        (Some(inline), None) => inline,
        (None, Some(file)) => {
            let prompt_path = if Path::new(&file).is_absolute() {
                Path::new(&file).to_path_buf()
            } else {
                config_file
                    .parent()
                    .unwrap_or_else(|| Path::new("."))
                    .join(&file)
            };
            if !prompt_path.exists() {
                return Err(RuntimeError::ConfigError(format!(
                    "System prompt file not found: {}",
                    prompt_path.display()
                )));
            }
            std::fs::read_to_string(&prompt_path)?
        }
        (Some(_), Some(_)) => {
            return Err(RuntimeError::ConfigError(
                "Config sets both system_prompt and system_prompt_file".to_string(),
            ));
        }
        (None, None) => {
            return Err(RuntimeError::ConfigError(
                "Config missing required field: system_prompt".to_string(),
            ));
        }
    };

    let config = AgentConfig {
        name: raw.name,
        description: raw.description,
        system_prompt,
        model: raw.model.unwrap_or_else(|| default_model.to_string()),
        temperature: raw.temperature,
        is_active: raw.is_active,
    };
    config.validate()?;

    Ok(AgentDefinition {
        config,
        tools: raw.tools,
    })
}

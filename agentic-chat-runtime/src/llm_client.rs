//! HTTP client for an Ollama model server.

use crate::interfaces::{BackendFactory, ChatBackend, RuntimeError};
use crate::types::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    #[serde(default)]
    name: String,
}

/// Client bound to one model and temperature.
#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
    model: String,
    temperature: f32,
}

impl OllamaClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `base_url` - Root URL of the Ollama server
    /// * `model` - Model identifier
    /// * `temperature` - Sampling temperature
    /// * `timeout` - Per-request HTTP timeout
    ///
    /// # Errors
    /// Returns `LLMError` if the HTTP client cannot be built
    pub fn new(
        base_url: &str,
        model: &str,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self, RuntimeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RuntimeError::LLMError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            model: model.to_string(),
            temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// List model names served by the backend, without `:tag` suffixes.
    pub async fn list_models(&self) -> Result<Vec<String>, RuntimeError> {
        list_models(&self.client, &self.base_url).await
    }

    async fn chat(&self, messages: &[Message]) -> Result<String, RuntimeError> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
            },
        };

        debug!("llm url={}", url);
        debug!("llm model={} messages={}", self.model, messages.len());

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    RuntimeError::LLMError(format!("Network connection failed: {}", e))
                } else if e.is_timeout() {
                    RuntimeError::LLMError(format!("Request timed out: {}", e))
                } else {
                    RuntimeError::LLMError(format!("HTTP request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            let error_msg = match status.as_u16() {
                404 => format!(
                    "Model '{}' or endpoint not found (404). Details: {}",
                    self.model, error_body
                ),
                500..=599 => format!("Server error: {}. Details: {}", status, error_body),
                _ => format!("HTTP error: {}. Details: {}", status, error_body),
            };
            return Err(RuntimeError::LLMError(error_msg));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| RuntimeError::LLMError(format!("Failed to parse response: {}", e)))?;

        Ok(parsed.message.content)
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    async fn invoke(&self, messages: &[Message]) -> Result<String, RuntimeError> {
        self.chat(messages).await
    }
}

async fn list_models(client: &reqwest::Client, base_url: &str) -> Result<Vec<String>, RuntimeError> {
    let url = format!("{}/api/tags", base_url.trim_end_matches('/'));
    let response = client.get(&url).send().await.map_err(|e| {
        RuntimeError::LLMError(format!("Failed to query models endpoint: {}", e))
    })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read models response".to_string());
        return Err(RuntimeError::LLMError(format!(
            "Failed to list models: HTTP {}. Details: {}",
            status, body
        )));
    }

    let tags: TagsResponse = response
        .json()
        .await
        .map_err(|e| RuntimeError::LLMError(format!("Failed to parse models response: {}", e)))?;

    let mut models: Vec<String> = tags
        .models
        .into_iter()
        .filter_map(|m| {
            let base = m.name.split(':').next().unwrap_or_default().to_string();
            (!base.is_empty()).then_some(base)
        })
        .collect();
    models.sort();
    models.dedup();
    Ok(models)
}

/// Builds [`OllamaClient`]s for the client cache.
#[derive(Debug, Clone)]
pub struct OllamaFactory {
    base_url: String,
    timeout: Duration,
}

impl OllamaFactory {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List models without going through the cache.
    pub async fn list_models(&self) -> Result<Vec<String>, RuntimeError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| RuntimeError::LLMError(format!("Failed to build HTTP client: {}", e)))?;
        list_models(&client, &self.base_url).await
    }
}

impl BackendFactory for OllamaFactory {
    fn connect(&self, model: &str, temperature: f32) -> Result<Arc<dyn ChatBackend>, RuntimeError> {
        Ok(Arc::new(OllamaClient::new(
            &self.base_url,
            model,
            temperature,
            self.timeout,
        )?))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_creation() {
        let client =
            OllamaClient::new("http://localhost:11434/", "llama3.2", 0.7, Duration::from_secs(5))
                .unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.model(), "llama3.2");
        assert_eq!(client.temperature(), 0.7);
    }

    #[test]
    fn test_request_serialization() {
        let messages = vec![Message::system("Be brief."), Message::user("Hello")];
        let request = ChatRequest {
            model: "llama3.2",
            messages: &messages,
            stream: false,
            options: ChatOptions { temperature: 0.5 },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "llama3.2",
                "messages": [
                    {"role": "system", "content": "Be brief."},
                    {"role": "user", "content": "Hello"}
                ],
                "stream": false,
                "options": {"temperature": 0.5}
            })
        );
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"model":"llama3.2","message":{"role":"assistant","content":"Hi!"},"done":true}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.message.content, "Hi!");
    }

    #[test]
    fn test_factory_builds_bound_client() {
        let factory = OllamaFactory::new(DEFAULT_BASE_URL, Duration::from_secs(5));
        assert!(factory.connect("mistral", 0.1).is_ok());
        assert_eq!(factory.base_url(), DEFAULT_BASE_URL);
    }
}

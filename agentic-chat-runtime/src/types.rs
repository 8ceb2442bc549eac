//! Core type definitions for the agentic chat runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Message role in conversation.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an in-band failure was caught.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Model invocation failed inside the responder node.
    Backend,
    /// Driving the graph failed outside a node body.
    Graph,
}

/// A failure surfaced in-band instead of escaping the engine.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub detail: String,
}

impl Failure {
    pub fn backend(detail: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Backend,
            detail: detail.into(),
        }
    }

    pub fn graph(detail: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Graph,
            detail: detail.into(),
        }
    }

    /// Human-readable text for transports that cannot distinguish errors.
    pub fn render(&self) -> String {
        match self.kind {
            FailureKind::Backend => {
                format!("I apologize, but I encountered an error: {}", self.detail)
            }
            FailureKind::Graph => format!("Error: {}", self.detail),
        }
    }
}

/// A single turn in the conversation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Set on assistant turns synthesized from a backend failure. Never
    /// read from inbound data.
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
}

impl Message {
    /// Create a new message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            failure: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Assistant turn standing in for a failed model invocation.
    pub fn from_failure(failure: Failure) -> Self {
        Self {
            role: Role::Assistant,
            content: failure.render(),
            failure: Some(failure),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// Ordered dialogue history owned by a single run.
///
/// Nodes only ever append; turns are never reordered or removed mid-run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    messages: Vec<Message>,
}

impl ConversationState {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append node output, returning the slice that was added.
    pub fn extend(&mut self, output: Vec<Message>) -> &[Message] {
        let start = self.messages.len();
        self.messages.extend(output);
        &self.messages[start..]
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

/// A tool available to the agent for this run.
///
/// The engine treats the catalog as informational; `parameters` is never
/// dereferenced.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub parameters: Option<serde_json::Value>,
}

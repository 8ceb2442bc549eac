//! Normalization of inbound turns into canonical messages.

use crate::interfaces::RuntimeError;
use crate::types::{Message, Role};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// A turn as received from a caller, before normalization.
///
/// Deserialized turns are always `Loose`, so everything read off the wire
/// goes through [`parse_turn`]. `Typed` is for turns built in code.
#[derive(Debug, Clone)]
pub enum InboundTurn {
    Typed(Message),
    Loose(Value),
}

impl<'de> Deserialize<'de> for InboundTurn {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(InboundTurn::Loose)
    }
}

impl From<Message> for InboundTurn {
    fn from(message: Message) -> Self {
        InboundTurn::Typed(message)
    }
}

impl From<Value> for InboundTurn {
    fn from(value: Value) -> Self {
        InboundTurn::Loose(value)
    }
}

/// Why an inbound turn could not become a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnRejection {
    NotAnObject,
    MissingRole,
    MissingContent,
    EmptyContent,
    UnknownRole(String),
}

impl fmt::Display for TurnRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnRejection::NotAnObject => f.write_str("turn is not an object"),
            TurnRejection::MissingRole => f.write_str("missing 'role'"),
            TurnRejection::MissingContent => f.write_str("missing 'content'"),
            TurnRejection::EmptyContent => f.write_str("'content' is empty"),
            TurnRejection::UnknownRole(role) => write!(f, "unknown role '{}'", role),
        }
    }
}

/// What to do with turns whose role is not recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizePolicy {
    /// Drop unknown roles and keep going. History length changes.
    #[default]
    Lenient,
    /// Reject the whole history on any bad turn.
    Strict,
}

/// Result of normalizing a history.
#[derive(Debug, Clone, Default)]
pub struct NormalizedHistory {
    pub messages: Vec<Message>,
    /// Index and reason for every turn dropped under the lenient policy.
    pub dropped: Vec<(usize, TurnRejection)>,
}

fn parse_role(raw: &str) -> Option<Role> {
    match raw {
        "user" | "human" => Some(Role::User),
        "assistant" | "ai" => Some(Role::Assistant),
        "system" => Some(Role::System),
        _ => None,
    }
}

/// Parse a single loosely-typed turn.
///
/// The role is read from `type` first, then `role`.
pub fn parse_turn(value: &Value) -> Result<Message, TurnRejection> {
    let object = value.as_object().ok_or(TurnRejection::NotAnObject)?;

    let role = object
        .get("type")
        .or_else(|| object.get("role"))
        .and_then(Value::as_str)
        .ok_or(TurnRejection::MissingRole)?;

    let content = object
        .get("content")
        .and_then(Value::as_str)
        .ok_or(TurnRejection::MissingContent)?;

    let role = parse_role(role).ok_or_else(|| TurnRejection::UnknownRole(role.to_string()))?;

    if content.is_empty() {
        return Err(TurnRejection::EmptyContent);
    }

    Ok(Message::new(role, content))
}

/// Normalize a sequence of inbound turns.
///
/// # Errors
/// Returns `InputError` for malformed turns. Under `Lenient`, unknown roles
/// are dropped instead.
pub fn normalize_history<I>(turns: I, policy: NormalizePolicy) -> Result<NormalizedHistory, RuntimeError>
where
    I: IntoIterator<Item = InboundTurn>,
{
    let mut history = NormalizedHistory::default();

    for (index, turn) in turns.into_iter().enumerate() {
        let parsed = match turn {
            InboundTurn::Typed(message) if message.content.is_empty() => {
                Err(TurnRejection::EmptyContent)
            }
            InboundTurn::Typed(message) => Ok(message),
            InboundTurn::Loose(value) => parse_turn(&value),
        };

        match parsed {
            Ok(message) => history.messages.push(message),
            Err(TurnRejection::UnknownRole(role)) if policy == NormalizePolicy::Lenient => {
                warn!("Dropping turn {} with unknown role '{}'", index, role);
                history.dropped.push((index, TurnRejection::UnknownRole(role)));
            }
            Err(rejection) => {
                return Err(RuntimeError::InputError(format!(
                    "Invalid message at index {}: {}",
                    index, rejection
                )));
            }
        }
    }

    Ok(history)
}

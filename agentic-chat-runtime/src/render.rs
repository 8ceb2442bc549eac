//! Renderers turning engine fragments into transport payloads.
//!
//! The engine never emits a terminal marker; transports call `done()` after
//! the fragment stream is exhausted.

use crate::engine::Fragment;
use serde_json::{json, Value};

pub const SSE_DONE: &str = "data: [DONE]\n\n";

/// Converts fragments into one transport's payloads.
pub trait FragmentRenderer {
    type Output;

    fn fragment(&self, fragment: &Fragment) -> Self::Output;

    /// Terminal marker sent after the last fragment.
    fn done(&self) -> Self::Output;
}

/// Plain text. Errors are rendered like content.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextRenderer;

impl FragmentRenderer for TextRenderer {
    type Output = String;

    fn fragment(&self, fragment: &Fragment) -> String {
        fragment.render()
    }

    fn done(&self) -> String {
        String::new()
    }
}

/// Server-sent event lines: `data: …` blocks and a `[DONE]` marker.
#[derive(Debug, Default, Clone, Copy)]
pub struct SseRenderer;

impl FragmentRenderer for SseRenderer {
    type Output = String;

    fn fragment(&self, fragment: &Fragment) -> String {
        format!("data: {}\n\n", fragment.render())
    }

    fn done(&self) -> String {
        SSE_DONE.to_string()
    }
}

/// JSON envelopes for a socket transport.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsRenderer {
    /// Send errors as `{"type":"error"}` instead of as ordinary chunks.
    pub distinct_errors: bool,
}

impl WsRenderer {
    pub fn error(message: &str) -> Value {
        json!({"type": "error", "message": message})
    }
}

impl FragmentRenderer for WsRenderer {
    type Output = Value;

    fn fragment(&self, fragment: &Fragment) -> Value {
        match fragment {
            Fragment::Error { text, .. } if self.distinct_errors => Self::error(text),
            other => json!({"type": "chunk", "content": other.render()}),
        }
    }

    fn done(&self) -> Value {
        json!({"type": "done"})
    }
}

//! Terminal framing of engine output.

use agentic_chat_runtime::{
    Fragment, FragmentRenderer, FragmentStream, Reply, SseRenderer, TextRenderer, WsRenderer,
};
use anyhow::Result;
use clap::ValueEnum;
use futures::StreamExt;
use std::io::Write;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Raw text, errors printed like content.
    #[default]
    Text,
    /// `data: …` blocks ending with `data: [DONE]`.
    Sse,
    /// One JSON envelope per line ending with `{"type":"done"}`.
    Json,
}

impl OutputFormat {
    fn fragment(&self, fragment: &Fragment) -> String {
        match self {
            OutputFormat::Text => TextRenderer.fragment(fragment),
            OutputFormat::Sse => SseRenderer.fragment(fragment),
            OutputFormat::Json => format!("{}\n", json_renderer().fragment(fragment)),
        }
    }

    fn done(&self) -> String {
        match self {
            OutputFormat::Text => format!("{}\n", TextRenderer.done()),
            OutputFormat::Sse => SseRenderer.done(),
            OutputFormat::Json => format!("{}\n", json_renderer().done()),
        }
    }
}

fn json_renderer() -> WsRenderer {
    WsRenderer {
        distinct_errors: true,
    }
}

/// What was shown to the user for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    /// Concatenated text fragments.
    pub text: String,
    pub failed: bool,
}

impl Transcript {
    fn record(&mut self, fragment: &Fragment) {
        match fragment {
            Fragment::Text(text) => self.text.push_str(text),
            Fragment::Error { .. } => self.failed = true,
        }
    }
}

/// Write fragments as they arrive, then the done marker.
pub async fn write_stream<W: Write>(
    mut fragments: FragmentStream,
    format: OutputFormat,
    out: &mut W,
) -> Result<Transcript> {
    let mut transcript = Transcript::default();

    while let Some(fragment) = fragments.next().await {
        transcript.record(&fragment);
        write!(out, "{}", format.fragment(&fragment))?;
        out.flush()?;
    }

    write!(out, "{}", format.done())?;
    out.flush()?;
    Ok(transcript)
}

/// Write an atomic reply framed like a single fragment.
pub fn write_reply<W: Write>(reply: Reply, format: OutputFormat, out: &mut W) -> Result<Transcript> {
    let fragment = match reply {
        Reply::Failed(failure) => Fragment::failure(&failure),
        other => Fragment::Text(other.into_text()),
    };

    let mut transcript = Transcript::default();
    transcript.record(&fragment);
    write!(out, "{}{}", format.fragment(&fragment), format.done())?;
    out.flush()?;
    Ok(transcript)
}

use crate::config::Settings;
use anyhow::{Context, Result};
use std::io::Write;

pub async fn run<W: Write>(settings: &Settings, out: &mut W) -> Result<()> {
    let models = settings
        .factory()
        .list_models()
        .await
        .with_context(|| format!("Failed to list models at {}", settings.base_url))?;

    if models.is_empty() {
        writeln!(out, "No models installed at {}", settings.base_url)?;
        return Ok(());
    }

    for model in models {
        let marker = if model == settings.default_model { "*" } else { " " };
        writeln!(out, "{} {}", marker, model)?;
    }
    Ok(())
}

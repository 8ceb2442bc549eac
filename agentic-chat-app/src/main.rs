use agentic_chat_app::cli::{Cli, Command};
use agentic_chat_app::commands::{self, build_engine, load_agent};
use agentic_chat_app::config::Settings;
use agentic_chat_app::repl::Repl;
use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let settings = Settings::from_args(cli.settings)?;

    #[cfg(feature = "prometheus")]
    install_metrics_exporter(&settings)?;

    let mut stdout = std::io::stdout();
    match cli.command {
        Command::Models => commands::models::run(&settings, &mut stdout).await?,
        Command::Run(args) => {
            let request = args.into_request();
            let transcript = commands::run::run(&settings, &request, &mut stdout).await?;
            if transcript.failed {
                std::process::exit(1);
            }
        }
        Command::Repl(args) => {
            let definition = load_agent(&args.agent, &settings)?;
            let engine = build_engine(&settings);
            let stream = args.stream.choice().unwrap_or(settings.stream);
            let mut repl = Repl::new(engine, definition, stream);
            repl.run().await?;
        }
    }

    Ok(())
}

/// Logs go to stderr so replies on stdout stay clean.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "prometheus")]
fn install_metrics_exporter(settings: &Settings) -> Result<()> {
    use anyhow::Context;

    let addr: std::net::SocketAddr = settings
        .metrics_addr
        .parse()
        .with_context(|| format!("Invalid AGENTIC_CHAT_METRICS_ADDR: {}", settings.metrics_addr))?;
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;
    tracing::info!("Prometheus exporter listening on {}", addr);
    Ok(())
}

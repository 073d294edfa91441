//! twintrap - captive portal cloner and evil-twin portal server
//!
//! Probes a joined network for a captive portal, clones the portal page into
//! a self-contained local copy, and serves it (or a built-in variant) behind
//! wildcard DNS to capture login submissions. For authorized assessments
//! only.

mod clone;
mod config;
mod creds;
mod error;
mod menu;
mod output;
mod probe;
mod scanner;
mod server;
mod templates;
mod transform;

use anyhow::Result;
use clap::Parser;
use output::{ConsoleSink, FileSink, Reporter, Sink};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "twintrap")]
#[command(about = "Captive portal cloner / evil-twin portal server", long_about = None)]
struct Args {
    /// Config file path (default: config.toml search path)
    #[arg(short, long)]
    config: Option<String>,

    /// Start serving this portal variant immediately
    /// (generic, hotel, airport, coffee, cloned)
    #[arg(long)]
    serve: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let cfg = config::Config::load(args.config.as_deref())?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.logging.level)),
        )
        .init();

    tracing::info!("twintrap v0.1.0 - captive portal research tool");

    let reporter = build_reporter(&cfg)?;
    let mut menu = menu::Menu::new(&cfg, reporter)?;

    // --serve is a shortcut through the same state machine the prompt uses.
    if let Some(variant) = &args.serve {
        menu.handle_line("serve").await?;
        menu.handle_line(variant).await?;
        if !menu.server().is_running() {
            anyhow::bail!("failed to start portal server for variant '{variant}'");
        }
    }

    menu.run().await
}

/// Console output, mirrored to a report file when one is configured.
fn build_reporter(cfg: &config::Config) -> Result<Reporter> {
    let mut sinks: Vec<Box<dyn Sink>> = vec![Box::new(ConsoleSink)];

    if !cfg.logging.report_file.is_empty() {
        sinks.push(Box::new(FileSink::open(&cfg.logging.report_file)?));
    }

    Ok(Reporter::new(sinks))
}

// src/main.rs — DevicePulse entry point

use clap::Parser;
use std::path::Path;
use std::sync::Arc;

use devicepulse::api::{self, ApiState};
use devicepulse::gateway::gemini::GeminiGateway;
use devicepulse::infra::config::Config;
use devicepulse::infra::logger;
use devicepulse::reports::store::InMemoryReportStore;

/// Device-health monitoring backend: live telemetry streaming, fault
/// triggers, and AI-assisted diagnostic reports.
#[derive(Parser, Debug)]
#[command(name = "devicepulse", version)]
struct Cli {
    /// Path to a config file (defaults to ./devicepulse.toml when present).
    #[arg(long)]
    config: Option<String>,

    /// Override the listen port from the config.
    #[arg(long, short)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    // Initialize logging (respects RUST_LOG)
    logger::init_logging("info");

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => Config::load_from(Path::new(path))?,
        None => Config::load()?,
    };
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let state = ApiState {
        reports: Arc::new(InMemoryReportStore::new()),
        gateway: Arc::new(GeminiGateway::new(&config.gateway)),
        simulation: config.simulation.clone(),
    };

    api::start_server(&config.server, state).await
}

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use waypoint_logging::LoggingConfig;
use waypoint_server::{ServerConfig, Services};

/// Streams place descriptions for the simulator's current position to connected viewers.
#[derive(Parser, Debug)]
#[command(name = "waypoint", version)]
struct Cli {
    /// Settings file (defaults to ~/.waypoint/settings.json).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Listen port, overriding settings and environment.
    #[arg(long)]
    port: Option<u16>,

    /// Emit JSON log lines.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    waypoint_logging::init_logging(&LoggingConfig {
        json: cli.json_logs,
        ..Default::default()
    });

    let path = cli.settings.unwrap_or_else(waypoint_settings::settings_path);
    let mut settings = waypoint_settings::load_settings_from_path(&path)
        .with_context(|| format!("loading settings from {}", path.display()))?;
    if let Some(port) = cli.port {
        settings.server.port = port;
    }
    if settings.geocoder.api_key.is_none() {
        tracing::warn!("no geocoder API key configured; set LOCATIONIQ_API_KEY");
    }

    info!(
        bridge = %settings.bridge.url,
        completion = %settings.completion.base_url,
        model = %settings.completion.model,
        "starting waypoint"
    );

    let services = Services::from_settings(&settings);
    let handle = waypoint_server::start(ServerConfig::from_settings(&settings.server), services)
        .await
        .context("starting server")?;
    info!(port = handle.port, "listening for viewers on /ws");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("shutdown requested");
    handle.shutdown().await;
    Ok(())
}

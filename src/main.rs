// src/main.rs
//! NMEA Monitor - HTTP relay for NMEA channel batches and position fixes

use anyhow::Context;
use clap::Parser;
use nmea_monitor::{MonitorConfig, Server, SnapshotStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "nmea-monitor")]
#[command(about = "Serve the latest parsed NMEA and location snapshot over HTTP", long_about = None)]
struct Cli {
    /// Address to bind (overrides the config file)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Config file (defaults to ~/.config/nmea-monitor/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reject position fixes outside valid latitude/longitude ranges
    #[arg(long)]
    check_range: bool,

    /// Write the effective configuration back to the config file
    #[arg(long)]
    save_config: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &cli.config {
        Some(path) => MonitorConfig::load_from(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => MonitorConfig::load().unwrap_or_else(|e| {
            warn!("Using default configuration: {}", e);
            MonitorConfig::default()
        }),
    };
    config.update_bind(cli.host, cli.port);
    if cli.check_range {
        config.validate_coordinate_range = true;
    }
    config.validate().context("invalid configuration")?;

    if cli.save_config {
        let saved = match &cli.config {
            Some(path) => config.save_to(path),
            None => config.save(),
        };
        saved.context("saving configuration")?;
        info!("Configuration saved");
    }

    info!(
        bind = %config.bind_address(),
        range_check = config.validate_coordinate_range,
        "Starting NMEA monitor"
    );

    let store = Arc::new(SnapshotStore::new());
    let server = Server::bind(&config, store)
        .await
        .context("starting HTTP server")?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received Ctrl+C, shutting down...");
        })
        .await
        .context("running HTTP server")?;

    Ok(())
}

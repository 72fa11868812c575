//! uadmx - node graph to DMX bridge
//!
//! Loads an OPC UA style nodeset describing lighting fixtures, resolves each
//! capability variable to a DMX channel and serves reads and writes of those
//! variables over HTTP, sending the results out as Art-Net.

#![warn(missing_docs)]

mod config;
mod logging_setup;
mod startup;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use config::BridgeConfig;
use uadmx_control::WebServer;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "uadmx", version, about)]
struct Cli {
    /// Configuration file (defaults to ./uadmx.toml when present)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Override the HTTP port
    #[arg(long)]
    port: Option<u16>,

    /// Keep DMX frames in memory instead of sending Art-Net
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Override the log level
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply(&self, config: &mut BridgeConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.dry_run {
            config.artnet.dry_run = true;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => warn!("Cannot listen for ctrl-c: {}", e),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (mut config, source) = BridgeConfig::locate(cli.config.as_deref())?;
    cli.apply(&mut config);

    config.logging.start_session();
    let _log_guard = logging_setup::init(&config.logging)?;

    info!("==========================================");
    info!("===       uadmx Session Started        ===");
    info!("==========================================");
    match &source {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: defaults"),
    }

    let state = startup::build_state(&config)?;
    let patterns = state.patterns.clone();

    WebServer::new(config.server.clone(), state)
        .run_until(shutdown_signal())
        .await?;

    patterns.stop().await;
    info!("uadmx stopped");
    Ok(())
}

//! # director-agent
//!
//! Director backend binary: loads settings, wires the collaborators into the
//! server and runs until ctrl-c.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use director_integrations::{KeywordCueGenerator, ManualTempoEngine, TelnetConsole};
use director_server::config::ServerConfig;
use director_server::{Collaborators, DirectorServer};
use director_settings::DirectorSettings;

/// Director backend server.
#[derive(Parser, Debug)]
#[command(name = "director-agent", about = "Lighting console AI director backend")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Settings file (default `~/.director/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log level or filter directive (overrides settings).
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON log lines.
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    /// Apply command-line overrides on top of loaded settings.
    fn apply(&self, settings: &mut DirectorSettings) {
        if let Some(ref host) = self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(ref level) = self.log_level {
            settings.logging.level.clone_from(level);
        }
        if self.json_logs {
            settings.logging.json = true;
        }
    }
}

/// Build the server with the built-in collaborators.
fn build_server(settings: &DirectorSettings) -> DirectorServer {
    let collaborators = Collaborators {
        console: Arc::new(TelnetConsole::new(Duration::from_millis(
            settings.console.connect_timeout_ms,
        ))),
        audio: Arc::new(ManualTempoEngine::new(settings.audio.devices.clone())),
        cues: Arc::new(KeywordCueGenerator::new()),
    };
    DirectorServer::new(ServerConfig::from(settings), collaborators)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings_path = args
        .settings
        .clone()
        .unwrap_or_else(director_settings::settings_path);
    let mut settings = director_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;
    args.apply(&mut settings);

    director_core::logging::init_subscriber(&settings.logging.level, settings.logging.json);

    let mut server = build_server(&settings);
    match director_server::metrics::install_recorder() {
        Ok(handle) => server = server.with_metrics(handle),
        Err(err) => tracing::warn!(error = %err, "metrics recorder unavailable, /metrics disabled"),
    }

    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!(
        version = director_core::VERSION,
        max_connections = settings.server.max_connections,
        "Director listening on http://{addr}"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    server
        .shutdown()
        .graceful_shutdown(vec![handle], None)
        .await;
    tracing::info!("Shutdown complete");
    Ok(())
}

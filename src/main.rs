use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pairlink_server::{AppState, DispatchConfig, QrPngRenderer, ServerConfig, SessionService};
use pairlink_settings::{load_settings, load_settings_from_path, PairlinkSettings};
use pairlink_telemetry::{init_telemetry, TelemetryConfig};

#[derive(Parser)]
#[command(name = "pairlink", version, about = "Simulated device-pairing and messaging server")]
struct Cli {
    /// Settings file (defaults to ~/.pairlink/settings.json)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Bind address, overrides settings
        #[arg(long)]
        host: Option<String>,
        /// Listen port, overrides settings
        #[arg(long)]
        port: Option<u16>,
        /// Emit JSON log lines
        #[arg(long)]
        json_logs: bool,
    },
    /// Print the effective settings as JSON and exit
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = match &cli.settings {
        Some(path) => load_settings_from_path(path),
        None => load_settings(),
    }
    .context("failed to load settings")?;

    let command = cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
        json_logs: false,
    });

    let mut settings = loaded.settings.clone();
    if let Command::Serve {
        host,
        port,
        json_logs,
    } = &command
    {
        if let Some(host) = host {
            settings.server.host = host.clone();
        }
        if let Some(port) = port {
            settings.server.port = *port;
        }
        settings.logging.json |= *json_logs;
    }

    init_telemetry(&TelemetryConfig {
        level: settings.logging.level.clone(),
        json: settings.logging.json,
    })
    .context("failed to initialize logging")?;
    loaded.log();

    match command {
        Command::Config => {
            let json = serde_json::to_string_pretty(&settings)
                .context("failed to serialize settings")?;
            println!("{json}");
            Ok(())
        }
        Command::Serve { .. } => serve(settings).await,
    }
}

async fn serve(settings: PairlinkSettings) -> anyhow::Result<()> {
    tracing::info!("starting pairlink");

    let service = SessionService::new(
        Arc::new(QrPngRenderer::from(&settings.qr)),
        DispatchConfig::from(&settings.dispatch),
    );
    let state = AppState::new(service, settings.server.default_phone.clone());

    let handle = pairlink_server::start(ServerConfig::from(&settings.server), state)
        .await
        .context("failed to start server")?;

    tracing::info!(port = handle.port, "pairlink ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl+c")?;

    tracing::info!("shutting down");
    handle.shutdown();
    Ok(())
}


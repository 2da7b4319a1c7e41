mod config;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use config::{DepotConfig, LogFormat, load_config, validate_config, write_config};
use ota_depot_http::HttpServer;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ota-depot")]
#[command(about = "Serves the newest firmware image to ESP8266 OTA clients", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file (optional; defaults apply if missing)
    #[arg(short, long, env = "OTA_DEPOT_CONFIG", default_value = "/etc/ota-depot/config.toml")]
    config: PathBuf,

    /// Write the effective configuration to the config path and exit
    #[arg(long)]
    init_config: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    check_config: bool,

    /// Create the firmware root directory if it does not exist
    #[arg(long)]
    create_firmware_root: bool,

    /// Address to listen on, `host:port`; an empty host (`:8080`) means all interfaces
    #[arg(long, env = "LISTEN_ADDR", value_parser = parse_listen_addr)]
    listen_addr: Option<SocketAddr>,

    /// Directory holding one subdirectory per firmware family
    #[arg(long, env = "FIRMWARE_PATH")]
    firmware_root: Option<PathBuf>,

    /// Log filter, e.g. `info` or `ota_depot_core=debug,tower_http=info`
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    /// Write logs to this file instead of stdout
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Accept `host:port` the way Go's net.Listen does: the host may be empty or
/// a name that resolves locally.
fn parse_listen_addr(value: &str) -> std::result::Result<SocketAddr, String> {
    if let Some(port) = value.strip_prefix(':') {
        return format!("0.0.0.0:{}", port)
            .parse()
            .map_err(|e| format!("invalid listen address {:?}: {}", value, e));
    }
    if let Ok(addr) = value.parse() {
        return Ok(addr);
    }
    value
        .to_socket_addrs()
        .map_err(|e| format!("invalid listen address {:?}: {}", value, e))?
        .next()
        .ok_or_else(|| format!("listen address {:?} did not resolve", value))
}

impl Cli {
    fn apply_overrides(&self, config: &mut DepotConfig) {
        if let Some(addr) = self.listen_addr {
            config.server.listen_addr = addr;
        }
        if let Some(ref root) = self.firmware_root {
            config.server.firmware_root = root.clone();
        }
        if let Some(ref level) = self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        if let Some(ref file) = self.log_file {
            config.logging.file = Some(file.clone());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        load_config(&cli.config)?
    } else {
        DepotConfig::default()
    };
    cli.apply_overrides(&mut config);

    if cli.create_firmware_root {
        tokio::fs::create_dir_all(&config.server.firmware_root)
            .await
            .context("Failed to create firmware root")?;
    }

    if cli.init_config {
        write_config(&cli.config, &config)?;
        println!("Wrote config to {}", cli.config.display());
        return Ok(());
    }

    if cli.check_config {
        validate_config(&config)?;
        println!("Config OK: {}", cli.config.display());
        return Ok(());
    }

    validate_config(&config).context("Invalid configuration")?;

    let _log_guard = logging::init_logging(&config.logging)?;

    info!("Starting OTA depot...");
    let server = HttpServer::new(config.server);
    server.run(shutdown_signal()).await?;
    info!("Shut down cleanly");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutting down...");
}

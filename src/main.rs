use anyhow::{Context, Result};
use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use botfleet::coordinator::config::ConfigOverrides;
use botfleet::coordinator::{CoordinatorConfig, CoordinatorServer};

#[derive(Parser)]
#[command(
    name = "botfleet",
    version,
    about = "Coordinator for a fleet of networked robots",
    long_about = None
)]
struct Cli {
    /// Port to listen on (default 42)
    port: Option<u16>,

    /// Host address to bind
    #[arg(long)]
    host: Option<IpAddr>,

    /// Capacity of the movement command queue
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Timeout for relaying a movement to a device, in milliseconds
    #[arg(long)]
    relay_timeout_ms: Option<u64>,

    /// Load configuration from a TOML file instead of the environment
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Queue movements without relaying them to devices
    #[arg(long)]
    no_dispatch: bool,

    /// Disable per-request logging
    #[arg(long)]
    no_request_logging: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, default_value = "text")]
    log_format: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging
    setup_tracing(&cli.log_format, cli.verbose)?;

    let config = load_config(&cli)?;
    let server = CoordinatorServer::new(config).context("Failed to create coordinator server")?;

    println!("{}", server.info().display());
    println!();
    println!("Endpoints:");
    println!("  POST /reg - Register a device, returns its ID");
    println!("  POST /mov - Queue a movement for a device");
    println!();
    println!("Press Ctrl+C to stop.\n");

    server
        .start_with_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
                Err(e) => tracing::error!("Failed to listen for Ctrl+C: {e}"),
            }
        })
        .await?;

    tracing::info!("botfleet stopped");
    Ok(())
}

fn load_config(cli: &Cli) -> Result<CoordinatorConfig> {
    let config = match &cli.config {
        Some(path) => CoordinatorConfig::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => CoordinatorConfig::from_env().context("Invalid environment configuration")?,
    };

    let overrides = ConfigOverrides {
        host: cli.host,
        port: cli.port,
        queue_capacity: cli.queue_capacity,
        relay_timeout_ms: cli.relay_timeout_ms,
        disable_dispatch: cli.no_dispatch,
        disable_request_logging: cli.no_request_logging,
    };

    config
        .with_overrides(&overrides)
        .context("Invalid command-line override")
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = match std::env::var("RUST_LOG") {
        Ok(filter) if !filter.is_empty() => tracing_subscriber::EnvFilter::try_new(filter)
            .context("Invalid RUST_LOG filter")?,
        _ if verbose => tracing_subscriber::EnvFilter::new("botfleet=debug,tower_http=debug,info"),
        _ => tracing_subscriber::EnvFilter::new("botfleet=info,warn"),
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

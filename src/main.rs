//! Proxy probe server.
//!
//! ```text
//!   client ──▶ proxy under test ──▶ ┌──────────────────────────────┐
//!                                   │ proxy-probe                  │
//!                                   │  request id / trace / limits │
//!                                   │  snapshot → diagnostics      │
//!   client ◀── proxy under test ◀── │  JSON echo + anonymity level │
//!                                   └──────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use proxy_probe::config::{load_config, validate_config, ConfigError, ProbeConfig};
use proxy_probe::observability::{init_logging, init_metrics};
use proxy_probe::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "proxy-probe")]
#[command(about = "Echo request metadata and classify the proxy in front of it", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProbeConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    init_logging(&config.observability)?;

    tracing::info!("proxy-probe v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validation already checked the address.
        let addr = config.observability.metrics_address.parse()?;
        init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

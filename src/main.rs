//! Dialogue demo server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────▶ http::server (limits, request id, trace, timeout)
//!                        │
//!                        ▼
//!                    Dialogue ──▶ switch(routes) ──▶ auth ──▶ handler
//!                        │              │
//!                        │              └──▶ not_found_handler
//!                        ▼
//!     Client Response ◀── terminated response
//! ```

use std::path::PathBuf;

use clap::Parser;

use dialogue::app::build_routes;
use dialogue::config::{load_config, validate_config, AppConfig, ConfigError};
use dialogue::observability::{logging::init_logging, metrics::init_metrics};
use dialogue::{HttpServer, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "dialogue", version, about = "Dialogue demo HTTP server")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "dialogue starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs(),
        max_body_bytes = config.limits.max_body_bytes,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let routes = build_routes(&config)?;

    let server = HttpServer::new(config, routes);
    let listener = server.bind().await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

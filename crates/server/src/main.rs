//! Courier server binary.

use anyhow::{Context, Result};
use clap::Parser;
use courier_core::config::AppConfig;
use courier_server::{AppState, HttpTransport, create_router};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Courier - LAN file-transfer coordination server
#[derive(Parser, Debug)]
#[command(name = "courierd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "COURIER_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Courier v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration. Every option has a default, so both the file and
    // the env vars are optional.
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();
    if config_path.exists() {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("No config file found at {}", args.config);
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("COURIER_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    // Initialize metadata store
    let metadata = courier_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize metadata store")?;

    // Verify connectivity before accepting requests. This catches bad paths
    // and permission problems early instead of on the first real request.
    metadata
        .health_check()
        .await
        .context("metadata store health check failed")?;
    tracing::info!("Metadata store initialized");

    // Byte transport for fan-out deliveries
    let transport = Arc::new(HttpTransport::new(config.transfer.delivery_timeout()));

    let state = AppState::new(config.clone(), metadata, transport);
    let app = create_router(state);

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

//! Startup orchestration.
//!
//! # Responsibilities
//! - Resolve configuration (file, then CLI overrides) and validate it
//! - Build the upstream pool before anything touches the network
//! - Bind the listener and serve until a shutdown signal
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and maps to a non-zero exit
//! - A bad pool never opens a listening socket

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{
    read_config, validate_config, ConfigError, ProxyConfig, UpstreamConfig,
};
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::load_balancer::{PoolError, UpstreamPool};
use crate::observability::{logging, metrics};
use crate::upstream::build_client;

/// Command line arguments.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "round-robin-proxy")]
#[command(about = "Round-robin HTTP reverse proxy", long_about = None)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listening port (overrides the file).
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Upstream URL; repeat for several. Replaces the file's list.
    #[arg(short, long = "upstream")]
    pub upstreams: Vec<String>,

    /// Log filter (overrides the file; RUST_LOG still wins).
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Anything that stops the proxy from starting or keeps it from serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("upstream pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("TLS client setup failed: {0}")]
    Tls(#[from] rustls::Error),

    #[error("logging setup failed: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error("metrics setup failed: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Merge the config file (if any) with CLI overrides, then validate.
pub fn resolve_config(cli: &Cli) -> Result<ProxyConfig, StartupError> {
    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => ProxyConfig::default(),
    };

    if let Some(port) = cli.port {
        config.listener.port = port;
    }
    if !cli.upstreams.is_empty() {
        config.upstreams = cli.upstreams.iter().map(UpstreamConfig::new).collect();
    }
    if let Some(level) = &cli.log_level {
        config.observability.log_level = level.clone();
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Build the server and its upstream pool. Does not touch the network.
pub fn build_server(config: &ProxyConfig) -> Result<HttpServer, StartupError> {
    let client = build_client(&config.timeouts)?;
    let pool = UpstreamPool::from_config(config, client)?;

    for (index, upstream) in pool.upstreams().iter().enumerate() {
        tracing::info!(index, upstream = %upstream.address(), "Upstream registered");
    }

    Ok(HttpServer::new(Arc::new(pool)))
}

/// Bind the configured listening address.
pub async fn bind(config: &ProxyConfig) -> Result<TcpListener, StartupError> {
    let address = config.listener.bind_address();
    TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })
}

/// Full startup sequence; returns once the server has shut down.
pub async fn run(cli: Cli) -> Result<(), StartupError> {
    let config = resolve_config(&cli)?;
    logging::init_logging(&config.observability)?;

    tracing::info!(
        bind_address = %config.listener.bind_address(),
        upstreams = config.upstreams.len(),
        request_timeout_secs = config.timeouts.request_secs,
        passive_health = config.health.passive_enabled,
        "Configuration loaded"
    );

    let server = build_server(&config)?;

    if config.observability.metrics_enabled {
        // Already validated.
        if let Ok(addr) = config.observability.metrics_address.parse::<SocketAddr>() {
            metrics::init_metrics(addr)?;
        }
    }

    let listener = bind(&config).await?;
    if let Ok(local) = listener.local_addr() {
        tracing::info!(address = %local, "Serving requests");
    }

    let shutdown = Shutdown::new();
    tokio::spawn(signals::wait_for_signal(shutdown.clone()));

    server
        .run(listener, shutdown.subscribe())
        .await
        .map_err(StartupError::Serve)?;

    tracing::info!("Shutdown complete");
    Ok(())
}

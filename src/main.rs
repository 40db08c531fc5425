//! Private Network Helper
//!
//! Small HTTP helper for a private IPv6 network whose DNS publishes
//! application topology under `.internal`.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  PRIVATE NETWORK HELPER                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  HTTP API (8888)         ←── /apps, /ping, /metrics        │
//! │  Discovery Aggregator    ←── TXT/AAAA walk of .internal    │
//! │  DNS Lookup (hickory)    ←── system or configured servers  │
//! │  Reachability Probe      ←── timed TCP connect             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

mod api;
mod config;
mod discovery;
mod probe;
mod types;

use api::Metrics;
use config::HelperConfig;
use discovery::{DnsLookup, HickoryLookup};

/// Private network helper - DNS discovery and reachability probes
#[derive(Parser, Debug)]
#[command(name = "privnet-helper")]
#[command(version)]
#[command(about = "Discover apps and instances on a private network", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "privnet-helper.toml")]
    config: PathBuf,

    /// HTTP API port
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind the HTTP API to
    #[arg(long)]
    bind: Option<String>,

    /// Nameserver to query (ip:port), may be repeated
    #[arg(long = "nameserver")]
    nameservers: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Write the effective configuration to the config path and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into())
        )
        .init();

    info!("🛰️  Private Network Helper v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = if args.config.exists() {
        HelperConfig::load(&args.config)?
    } else {
        warn!("Config file not found, using defaults");
        HelperConfig::default()
    };

    // Override config with CLI args
    let config = config
        .with_api_port(args.port)
        .with_bind_addr(args.bind)
        .with_nameservers(args.nameservers);

    config.validate()?;

    if args.init_config {
        config.save(&args.config)?;
        info!("📝 Configuration written to {:?}", args.config);
        return Ok(());
    }

    info!("⚙️  Configuration:");
    info!("   Listen: {}", config.listen_addr()?);
    if config.nameservers.is_empty() {
        info!("   Nameservers: system configuration");
    } else {
        info!("   Nameservers: {}", config.nameservers.join(", "));
    }
    info!("   DNS timeout: {}s x{}", config.dns_timeout_secs, config.dns_attempts);
    info!("   Probe timeout: {}s", config.ping_timeout_secs);

    let shared_config = Arc::new(config);

    let dns: Arc<dyn DnsLookup> = Arc::new(HickoryLookup::from_config(&shared_config)?);
    let metrics = Arc::new(Metrics::new());

    let api_handle = tokio::spawn(api::run_api_server(
        shared_config.clone(),
        dns,
        metrics,
    ));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("🛑 Shutdown signal received");
        }
        result = api_handle => {
            match result {
                Ok(Ok(())) => info!("HTTP API stopped"),
                Ok(Err(e)) => {
                    error!("HTTP API exited: {:?}", e);
                    return Err(e);
                }
                Err(e) => {
                    error!("HTTP API task failed: {:?}", e);
                    return Err(e.into());
                }
            }
        }
    }

    info!("👋 Private Network Helper shutting down");
    Ok(())
}

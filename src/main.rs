//! Track Gateway - converts uploaded GPS tracks with gpsbabel

use clap::Parser;
use std::path::PathBuf;
use track_gateway::logging::init_logging;
use track_gateway::metrics::server::MetricsServer;
use track_gateway::{config::Config, server::Server, GpsBabel};
use tracing::{info, warn};

/// Track Gateway - HTTP front end for gpsbabel track conversion
#[derive(Parser, Debug)]
#[command(name = "track-gateway")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides server.address
    #[arg(short, long)]
    address: Option<String>,

    /// Log level (trace, debug, info, warn, error), overrides logging.level
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(address) = args.address {
        config.server.address = address;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    config.validate()?;

    init_logging(&config.logging)?;

    info!("Starting Track Gateway v{}", track_gateway::VERSION);
    match &args.config {
        Some(path) => info!("Loaded configuration from {:?}", path),
        None => info!("No configuration file given, using defaults"),
    }

    match GpsBabel::from_config(&config.convert).version().await {
        Ok(version) => info!(binary = %config.convert.binary, %version, "Found converter"),
        Err(e) => warn!(
            binary = %config.convert.binary,
            error = %e,
            "Converter not usable, conversions will fail"
        ),
    }

    let mut metrics_server = None;
    if cfg!(feature = "metrics") && config.metrics.enabled {
        let mut server = MetricsServer::on_port(config.metrics.port);
        let addr = server.start().await?;
        info!("Metrics server listening on {}", addr);
        metrics_server = Some(server);
    }

    let server = Server::new(config).await?;
    server.run().await?;

    if let Some(mut metrics_server) = metrics_server {
        metrics_server.shutdown().await;
    }

    Ok(())
}

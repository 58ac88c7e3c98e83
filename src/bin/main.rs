//! gslb-dns binary entry point.

use clap::Parser;
use gslb_dns::health::HealthRegistry;
use gslb_dns::platform::PlatformPool;
use gslb_dns::qlog::QueryLogger;
use gslb_dns::server::{parse_listen_addrs, GslbServer};
use gslb_dns::{loader, telemetry, GslbConfig, Reloader, ServerContext};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Authoritative GSLB DNS server with weighted node selection and active
/// health checks.
#[derive(Parser, Debug)]
#[command(name = "gslb-dns")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the main configuration file (JSON).
    #[arg(short, long, default_value = "gslb-dns.json")]
    config: PathBuf,

    /// Listener addresses, comma separated (address or address:port).
    #[arg(short, long, default_value = "0.0.0.0")]
    interface: String,

    /// Default port for listeners that do not name one.
    #[arg(short, long, default_value_t = 53)]
    port: u16,

    /// Check configuration and data files, then exit.
    #[arg(long)]
    check_config: bool,

    /// Answer reserved-zone debug queries only from loopback.
    #[arg(long)]
    private_debug: bool,

    /// Log level filter when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Prometheus exporter address (needs the `prometheus` feature).
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    telemetry::init(&args.log_level, args.metrics_addr)
        .map_err(|e| e as Box<dyn std::error::Error>)?;

    // The initial configuration load is fatal; reloads later are not.
    let config = GslbConfig::load(&args.config)?;

    if args.check_config {
        if let Err(err) = check_files(&config) {
            error!(%err, "configuration check failed");
            std::process::exit(2);
        }
        info!("configuration OK");
        return Ok(());
    }

    info!(
        config_file = %args.config.display(),
        platforms = config.platforms.len(),
        "Starting gslb-dns"
    );

    let query_log = match &config.query_log {
        Some(qlog_config) => Some(QueryLogger::new(qlog_config)?),
        None => None,
    };

    let pool = PlatformPool::new(HealthRegistry::new());
    let ctx = Arc::new(ServerContext::new(pool, query_log, args.private_debug));
    ctx.setup_reserved_zone();

    let shutdown = CancellationToken::new();

    let reloader = Reloader::new(ctx.clone(), args.config.clone(), config);
    let reload_tasks = reloader.spawn(shutdown.clone());

    let listen = parse_listen_addrs(&args.interface, args.port)?;
    let server = GslbServer::new(ctx, listen);
    let server_shutdown = shutdown.clone();
    let mut server_task = tokio::spawn(async move { server.run(server_shutdown).await });

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("signal received, stopping");
            shutdown.cancel();
            let _ = server_task.await;
        }
        result = &mut server_task => {
            shutdown.cancel();
            result??;
        }
    }

    for task in reload_tasks {
        let _ = task.await;
    }

    info!("gslb-dns shutdown complete");
    Ok(())
}

/// `--check-config`: parse every configured zone and node file.
fn check_files(config: &GslbConfig) -> Result<(), gslb_dns::GslbError> {
    let pool = PlatformPool::new(HealthRegistry::new());
    for (name, files) in &config.platforms {
        loader::load_zone_file(name, &files.zone_file)?;
        pool.add_platform(name, &files.node_file)?;
    }
    Ok(())
}

//! Fintech API Gateway
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ http::server ──▶ http::handlers::proxy
//!                (correlation ID,     │
//!                 tracing,            ├─▶ routing::ServiceRegistry (longest prefix)
//!                 rate limit)         │
//!                                     └─▶ forward::Forwarder
//!                                           ├─ resilience::CircuitBreakerRegistry
//!                                           ├─ per-attempt timeout
//!                                           └─ exponential backoff between attempts
//!                                                    │
//!     Client ◀── http::response ◀─────────────────────┘ ◀── Backend service
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use fintech_gateway::config::load_config;
use fintech_gateway::lifecycle::{wait_for_signal, Shutdown};
use fintech_gateway::observability::{logging, metrics};
use fintech_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "fintech-gateway")]
#[command(about = "API gateway for the fintech backend services", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "GATEWAY_CONFIG", default_value = "config/gateway.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = load_config(&args.config)?;
    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        bind_address = %config.listener.bind_address,
        services = config.services.len(),
        "fintech-gateway starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    let server = GatewayServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

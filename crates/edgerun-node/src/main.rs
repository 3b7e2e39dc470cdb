//! EdgeRun Edge Node Daemon

use std::net::SocketAddr;

use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use edgerun_core::NodeAddress;

mod config;
mod executor;
mod heartbeat;
mod server;

use config::Config;
use heartbeat::HeartbeatSender;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load config
    let config = Config::parse();
    let listen_addr: SocketAddr = config.listen_addr.parse()?;
    let advertise = NodeAddress::parse(&config.advertise_addr)?;

    info!(
        listen_addr = %listen_addr,
        advertise = %advertise,
        control_plane = %config.control_plane,
        "Starting EdgeRun node"
    );

    let shutdown = CancellationToken::new();

    // Start heartbeat loop
    let sender = HeartbeatSender::new(&config.control_plane, advertise);
    let heartbeat_handle = tokio::spawn(sender.run(config.heartbeat_interval(), shutdown.clone()));

    // Start HTTP server
    let listener = TcpListener::bind(listen_addr).await?;
    info!("Execute endpoint listening on {}", listen_addr);

    axum::serve(listener, server::create_router())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await?;

    shutdown.cancel();
    heartbeat_handle.await?;

    info!("Node stopped");
    Ok(())
}

//! EdgeRun Control Plane Server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use edgerun_control_plane::reaper::run_node_reaper;
use edgerun_control_plane::{
    http, AppState, Config, Dispatcher, HttpExecutionClient, InMemoryJobStore, NodeRegistry,
};

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
    let http_addr: SocketAddr = config.bind_addr.parse()?;

    // Build the engine
    let store = Arc::new(InMemoryJobStore::new());
    let registry = Arc::new(NodeRegistry::new());
    let client = Arc::new(HttpExecutionClient::new());
    let dispatcher = Arc::new(Dispatcher::new(
        store.clone(),
        registry.clone(),
        client,
        config.dispatcher(),
    ));
    let shutdown = dispatcher.shutdown_token();

    let state = AppState::new(store, registry.clone(), config.liveness_timeout());

    info!(
        http_addr = %http_addr,
        liveness_timeout_secs = config.liveness_timeout_secs,
        dispatch_workers = config.dispatch_workers,
        "Starting EdgeRun control plane"
    );

    let dispatcher_handle = tokio::spawn(dispatcher.clone().run());
    let reaper_handle = tokio::spawn(run_node_reaper(
        registry,
        config.eviction_after(),
        Duration::from_secs(30),
        shutdown.clone(),
    ));

    // Start HTTP server
    let listener = TcpListener::bind(http_addr).await?;
    info!("HTTP server listening on {}", http_addr);

    let http_shutdown = shutdown.clone();
    axum::serve(listener, http::create_router(state))
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Shutdown requested"),
                _ = http_shutdown.cancelled() => {}
            }
        })
        .await?;

    shutdown.cancel();
    dispatcher_handle.await?;
    reaper_handle.await?;

    info!("Control plane stopped");
    Ok(())
}

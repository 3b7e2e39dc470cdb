//! HTTP boundary of the control plane.
//!
//! Provides endpoints for:
//! - Job submission (`POST /v1/jobs`)
//! - Job status (`GET /v1/jobs/:id`)
//! - Node heartbeats (`POST /v1/heartbeat`)
//! - Node list API (`GET /v1/nodes`)
//! - Health check (`/health`)
//! - Prometheus metrics (`/metrics`)

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod handlers;
pub mod responses;

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // API routes
        .route("/v1/jobs", post(handlers::submit_job))
        .route("/v1/jobs/:id", get(handlers::get_job))
        .route("/v1/heartbeat", post(handlers::heartbeat))
        .route("/v1/nodes", get(handlers::list_nodes))
        // Observability routes
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

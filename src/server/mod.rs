//! HTTP Server module - REST API server implementation.
//!
//! This module provides the HTTP server for circo, including
//! routing, request handling, and response formatting.

pub mod handlers;
pub mod response;
pub mod state;

use crate::error::{CircoError, Result};
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post},
    Router,
};
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Creates the API router with all endpoints.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health and status endpoints
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/status", get(handlers::status))
        // Service endpoints
        .route("/api/v1/services", get(handlers::list_services))
        .route(
            "/api/v1/services/:name/start",
            post(handlers::start_service),
        )
        .route("/api/v1/services/:name/stop", post(handlers::stop_service))
        .route("/api/v1/services/:name", patch(handlers::patch_service))
        // Peer endpoints
        .route("/api/v1/peers", get(handlers::list_peers))
        .route("/api/v1/events", post(handlers::receive_event))
        // Audit log and wake-on-LAN
        .route("/api/v1/logs", get(handlers::logs))
        .route("/api/v1/wake", post(handlers::wake))
        // Add tracing layer
        .layer(TraceLayer::new_for_http())
        // Any inbound request is a chance to learn a peer
        .layer(middleware::from_fn_with_state(state.clone(), learn_peer))
        // Add state
        .with_state(state)
}

/// Learns a peer from the source address of every inbound request.
/// Non-routable addresses are rejected by the directory itself.
async fn learn_peer(
    State(state): State<Arc<AppState>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    state.peers.admit(remote.ip());
    next.run(request).await
}

/// Starts the HTTP server. Runs until the server task is aborted.
pub async fn serve(state: Arc<AppState>) -> Result<()> {
    let addr = SocketAddr::new(
        state
            .server_bind
            .parse()
            .map_err(|e| CircoError::config(format!("Invalid bind address: {}", e)))?,
        state.server_port,
    );

    let router = create_router(state);

    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| CircoError::config_with_source(format!("Failed to bind to {}", addr), e))?;

    // Connection info is required: inbound event handlers learn peers from
    // the source address.
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| CircoError::config_with_source("Server error", e))?;

    Ok(())
}

//! HTTP request handlers.
//!
//! This module contains all the HTTP endpoint handlers for the circo API.

use crate::catalog::DefinitionPatch;
use crate::error::CircoError;
use crate::notifier::PeerEvent;
use crate::server::response::{
    AgentInfo, AgentState, ApiResponse, EventAck, HealthData, HealthStatus, LogsData, PeersData,
    ServerInfo, ServicesData, StatsInfo, StatusData, WakeData, WakeRequest,
};
use crate::server::state::AppState;
use crate::supervisor::OperationResult;
use crate::wol::{self, MacAddress};
use axum::{
    extract::{ConnectInfo, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

/// Version string for the application.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maps an error to the HTTP status of its error code.
fn error_status(err: &CircoError) -> StatusCode {
    StatusCode::from_u16(err.code().http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Health check handler.
///
/// GET /api/v1/health
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.increment_requests();

    let data = HealthData {
        status: HealthStatus::Healthy,
        version: VERSION.to_string(),
        uptime_seconds: state.uptime_seconds(),
    };

    state.increment_success();
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

/// Agent status handler.
///
/// GET /api/v1/status
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.increment_requests();

    let stats_snapshot = state.stats.snapshot();

    let data = StatusData {
        agent: AgentInfo {
            name: state.agent_name.clone(),
            state: AgentState::Ready,
        },
        server: ServerInfo {
            bind: state.server_bind.clone(),
            port: state.server_port,
        },
        peer_count: state.peers.len(),
        stats: StatsInfo {
            requests_total: stats_snapshot.requests_total,
            requests_success: stats_snapshot.requests_success,
            requests_failed: stats_snapshot.requests_failed,
        },
        version: VERSION.to_string(),
        uptime_seconds: state.uptime_seconds(),
    };

    state.increment_success();
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

/// List services handler.
///
/// GET /api/v1/services
pub async fn list_services(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.increment_requests();

    match state.supervisor.service_states() {
        Ok(services) => {
            let data = ServicesData {
                total: services.len(),
                services,
            };
            state.increment_success();
            (StatusCode::OK, Json(ApiResponse::success(data)))
        }
        Err(err) => {
            error!(error = %err, "Failed to read service states");
            state.increment_failed();
            (
                error_status(&err),
                Json(ApiResponse::<ServicesData>::from_error(&err)),
            )
        }
    }
}

/// Start service handler.
///
/// POST /api/v1/services/:name/start
pub async fn start_service(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    state.increment_requests();
    info!(service = %name, "Processing start request");

    let result = state.supervisor.request_start(&name).await;
    operation_response(&state, result)
}

/// Stop service handler.
///
/// POST /api/v1/services/:name/stop
pub async fn stop_service(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    state.increment_requests();
    info!(service = %name, "Processing stop request");

    let result = state.supervisor.request_stop(&name).await;
    operation_response(&state, result)
}

/// Common response shaping for start/stop. Structured failures travel in
/// the data payload with 200; only lookup and catalog errors map to error
/// statuses.
fn operation_response(
    state: &AppState,
    result: crate::error::Result<OperationResult>,
) -> (StatusCode, Json<ApiResponse<OperationResult>>) {
    match result {
        Ok(outcome) => {
            if outcome.success {
                state.increment_success();
            } else {
                state.increment_failed();
            }
            (StatusCode::OK, Json(ApiResponse::success(outcome)))
        }
        Err(err) => {
            error!(error = %err, "Service operation failed");
            state.increment_failed();
            (error_status(&err), Json(ApiResponse::from_error(&err)))
        }
    }
}

/// Definition update handler. Unknown names are created from defaults.
///
/// PATCH /api/v1/services/:name
pub async fn patch_service(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(patch): Json<DefinitionPatch>,
) -> impl IntoResponse {
    state.increment_requests();
    info!(service = %name, "Processing definition update");

    match state.supervisor.update_definition(&name, &patch).await {
        Ok(updated) => {
            state.increment_success();
            (StatusCode::OK, Json(ApiResponse::success(updated)))
        }
        Err(err) => {
            error!(service = %name, error = %err, "Definition update failed");
            state.increment_failed();
            (error_status(&err), Json(ApiResponse::from_error(&err)))
        }
    }
}

/// Peer list handler.
///
/// GET /api/v1/peers
pub async fn list_peers(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.increment_requests();

    let peers: Vec<String> = state
        .peers
        .snapshot()
        .iter()
        .map(|addr| addr.to_string())
        .collect();
    let data = PeersData {
        total: peers.len(),
        peers,
    };

    state.increment_success();
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

/// Audit log handler.
///
/// GET /api/v1/logs
pub async fn logs(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.increment_requests();

    let data = LogsData {
        contents: state.audit.read(),
    };

    state.increment_success();
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

/// Inbound peer event handler. The sender is learned as a peer from the
/// connection source address only; the address claimed in the payload is
/// not trusted.
///
/// POST /api/v1/events
pub async fn receive_event(
    State(state): State<Arc<AppState>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    Json(event): Json<PeerEvent>,
) -> impl IntoResponse {
    state.increment_requests();
    info!(
        event = %event.event,
        sender = %event.sender_name,
        remote = %remote,
        "Received peer event"
    );

    let learned = state.peers.admit(remote.ip()).then(|| remote.ip().to_string());

    state
        .audit
        .record(&format!("Peer event {} from {}", event.event, event.sender_name));

    state.increment_success();
    (
        StatusCode::OK,
        Json(ApiResponse::success(EventAck {
            learned_peer: learned,
        })),
    )
}

/// Wake-on-LAN handler.
///
/// POST /api/v1/wake
pub async fn wake(
    State(state): State<Arc<AppState>>,
    Json(request): Json<WakeRequest>,
) -> impl IntoResponse {
    state.increment_requests();

    let mac = match MacAddress::parse(&request.mac) {
        Ok(mac) => mac,
        Err(err) => {
            state.increment_failed();
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<WakeData>::from_error(&err)),
            );
        }
    };

    match wol::wake(&mac) {
        Ok(()) => {
            info!(mac = %mac, "Sent wake packet");
            state.audit.record(&format!("Sent wake packet for {}", mac));
            state.increment_success();
            (
                StatusCode::OK,
                Json(ApiResponse::success(WakeData {
                    mac: mac.to_string(),
                })),
            )
        }
        Err(err) => {
            error!(mac = %mac, error = %err, "Wake packet failed");
            state.increment_failed();
            (error_status(&err), Json(ApiResponse::from_error(&err)))
        }
    }
}

//! API response types and formatting.
//!
//! This module defines the standard API response format used by all endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CircoError, ErrorResponse};
use crate::supervisor::ServiceStateView;

/// Standard API response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data (present on success).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error information (present on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
    /// Response timestamp.
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    /// Creates a successful response with data.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Creates a failed response with an error.
    pub fn error(error: ErrorResponse) -> ApiResponse<T> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(error),
            timestamp: Utc::now(),
        }
    }

    /// Creates a failed response from a CircoError.
    pub fn from_error(err: &CircoError) -> ApiResponse<T> {
        Self::error(ErrorResponse::from_error(err))
    }
}

/// Health check response data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthData {
    /// Health status.
    pub status: HealthStatus,
    /// Application version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
}

/// Health status enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// System is healthy.
    Healthy,
    /// System is degraded but operational.
    Degraded,
}

/// Agent status response data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusData {
    /// Agent information.
    pub agent: AgentInfo,
    /// Server information.
    pub server: ServerInfo,
    /// Number of known peer agents.
    pub peer_count: usize,
    /// Statistics.
    pub stats: StatsInfo,
    /// Application version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
}

/// Agent information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInfo {
    /// Agent name.
    pub name: String,
    /// Agent state.
    pub state: AgentState,
}

/// Agent state enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    /// Agent is ready to accept requests.
    Ready,
    /// Agent is shutting down.
    ShuttingDown,
}

/// Server information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Bind address.
    pub bind: String,
    /// Port number.
    pub port: u16,
}

/// Statistics information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsInfo {
    /// Total requests received.
    pub requests_total: u64,
    /// Successful requests.
    pub requests_success: u64,
    /// Failed requests.
    pub requests_failed: u64,
}

/// Service list response data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesData {
    /// Observed state per catalog entry, keyed by name.
    pub services: BTreeMap<String, ServiceStateView>,
    /// Total number of services.
    pub total: usize,
}

/// Peer list response data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeersData {
    /// Known peer addresses.
    pub peers: Vec<String>,
    /// Total number of peers.
    pub total: usize,
}

/// Audit log response data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsData {
    /// Raw log contents, newest line last.
    pub contents: String,
}

/// Wake-on-LAN request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakeRequest {
    /// Target hardware address.
    pub mac: String,
}

/// Wake-on-LAN response data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakeData {
    /// Normalized hardware address the packet was sent for.
    pub mac: String,
}

/// Acknowledgement for an inbound peer event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventAck {
    /// Address the sender was learned under, if it was admissible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learned_peer: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_api_response_success() {
        let response: ApiResponse<String> = ApiResponse::success("test data".to_string());

        assert!(response.success);
        assert_eq!(response.data, Some("test data".to_string()));
        assert!(response.error.is_none());
    }

    #[test]
    fn test_api_response_error() {
        let error = ErrorResponse::new(ErrorCode::ServiceNotFound, "Service not found: mpd");
        let response: ApiResponse<String> = ApiResponse::error(error);

        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.error.unwrap().code, ErrorCode::ServiceNotFound);
    }

    #[test]
    fn test_health_status_serialization() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Healthy).unwrap(),
            "\"healthy\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::Degraded).unwrap(),
            "\"degraded\""
        );
    }

    #[test]
    fn test_agent_state_serialization() {
        assert_eq!(
            serde_json::to_string(&AgentState::Ready).unwrap(),
            "\"ready\""
        );
        assert_eq!(
            serde_json::to_string(&AgentState::ShuttingDown).unwrap(),
            "\"shuttingdown\""
        );
    }

    #[test]
    fn test_wake_request_deserialization() {
        let request: WakeRequest =
            serde_json::from_str(r#"{"mac": "aa:bb:cc:dd:ee:ff"}"#).unwrap();
        assert_eq!(request.mac, "aa:bb:cc:dd:ee:ff");
    }
}

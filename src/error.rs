//! Error types and error handling for circo.
//!
//! This module defines all error types used throughout the application,
//! including error codes, error responses for the API, and CLI exit codes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Stable error codes exposed through the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// E001: Configuration or catalog file is invalid
    #[serde(rename = "E001")]
    ConfigInvalid,

    /// E002: Target service does not exist in the catalog
    #[serde(rename = "E002")]
    ServiceNotFound,

    /// E003: A command could not be started
    #[serde(rename = "E003")]
    LaunchFailed,

    /// E004: A process could not be signalled
    #[serde(rename = "E004")]
    TerminateFailed,

    /// E005: The process table could not be read
    #[serde(rename = "E005")]
    ObservationFailed,

    /// E006: A peer could not be reached
    #[serde(rename = "E006")]
    NotificationFailed,

    /// E007: Discovery advertisement or listener setup failed
    #[serde(rename = "E007")]
    DiscoveryFailed,

    /// E008: An address resolved to loopback or link-local
    #[serde(rename = "E008")]
    InvalidAddress,

    /// E009: Request is invalid
    #[serde(rename = "E009")]
    InvalidRequest,
}

impl ErrorCode {
    /// Returns the error code as a string (e.g., "E001").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalid => "E001",
            ErrorCode::ServiceNotFound => "E002",
            ErrorCode::LaunchFailed => "E003",
            ErrorCode::TerminateFailed => "E004",
            ErrorCode::ObservationFailed => "E005",
            ErrorCode::NotificationFailed => "E006",
            ErrorCode::DiscoveryFailed => "E007",
            ErrorCode::InvalidAddress => "E008",
            ErrorCode::InvalidRequest => "E009",
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::ConfigInvalid => 500,
            ErrorCode::ServiceNotFound => 404,
            ErrorCode::LaunchFailed => 500,
            ErrorCode::TerminateFailed => 500,
            ErrorCode::ObservationFailed => 500,
            ErrorCode::NotificationFailed => 502,
            ErrorCode::DiscoveryFailed => 500,
            ErrorCode::InvalidAddress => 400,
            ErrorCode::InvalidRequest => 400,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// CLI exit codes.
pub mod exit_code {
    /// Success
    pub const SUCCESS: i32 = 0;
    /// General error
    pub const GENERAL_ERROR: i32 = 1;
    /// Configuration error
    pub const CONFIG_ERROR: i32 = 2;
    /// Connection error
    pub const CONNECTION_ERROR: i32 = 3;
    /// Command line argument error
    pub const CLI_ERROR: i32 = 64;
}

/// The main error type for circo.
#[derive(Debug, Error)]
pub enum CircoError {
    /// Configuration or catalog file is invalid or cannot be loaded.
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Target service does not exist in the catalog.
    #[error("Service not found: {service}")]
    ServiceNotFound { service: String },

    /// A launch command could not be started.
    #[error("Failed to launch '{command}': {message}")]
    Launch { command: String, message: String },

    /// A process could not be signalled.
    #[error("Failed to terminate pid {pid}: {message}")]
    Terminate { pid: u32, message: String },

    /// The process table could not be read.
    #[error("Process observation failed: {message}")]
    Observation { message: String },

    /// A peer could not be notified.
    #[error("Notification to {peer} failed: {message}")]
    Notification { peer: String, message: String },

    /// Discovery advertisement or listener setup failed.
    #[error("Discovery error: {message}")]
    Discovery { message: String },

    /// An address resolved to loopback or link-local.
    #[error("Invalid address: {address}")]
    InvalidAddress { address: String },

    /// Request is invalid.
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Failed to reach a remote agent.
    #[error("Connection error: {target}")]
    Connection {
        target: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CircoError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            CircoError::Config { .. } => ErrorCode::ConfigInvalid,
            CircoError::ServiceNotFound { .. } => ErrorCode::ServiceNotFound,
            CircoError::Launch { .. } => ErrorCode::LaunchFailed,
            CircoError::Terminate { .. } => ErrorCode::TerminateFailed,
            CircoError::Observation { .. } => ErrorCode::ObservationFailed,
            CircoError::Notification { .. } => ErrorCode::NotificationFailed,
            CircoError::Discovery { .. } => ErrorCode::DiscoveryFailed,
            CircoError::InvalidAddress { .. } => ErrorCode::InvalidAddress,
            CircoError::InvalidRequest { .. } => ErrorCode::InvalidRequest,
            CircoError::Connection { .. } => ErrorCode::NotificationFailed,
            CircoError::Io(_) => ErrorCode::ConfigInvalid,
            CircoError::Yaml(_) => ErrorCode::ConfigInvalid,
            CircoError::Json(_) => ErrorCode::InvalidRequest,
        }
    }

    /// Returns the CLI exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CircoError::Config { .. } | CircoError::Yaml(_) => exit_code::CONFIG_ERROR,
            CircoError::Connection { .. } | CircoError::Notification { .. } => {
                exit_code::CONNECTION_ERROR
            }
            _ => exit_code::GENERAL_ERROR,
        }
    }

    /// Creates a configuration error with a message.
    pub fn config(message: impl Into<String>) -> Self {
        CircoError::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a configuration error with a message and source.
    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        CircoError::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a launch error.
    pub fn launch(command: impl Into<String>, message: impl Into<String>) -> Self {
        CircoError::Launch {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Creates a terminate error.
    pub fn terminate(pid: u32, message: impl Into<String>) -> Self {
        CircoError::Terminate {
            pid,
            message: message.into(),
        }
    }

    /// Creates an observation error.
    pub fn observation(message: impl Into<String>) -> Self {
        CircoError::Observation {
            message: message.into(),
        }
    }

    /// Creates a notification delivery error.
    pub fn notification(peer: impl Into<String>, message: impl Into<String>) -> Self {
        CircoError::Notification {
            peer: peer.into(),
            message: message.into(),
        }
    }

    /// Creates a discovery error.
    pub fn discovery(message: impl Into<String>) -> Self {
        CircoError::Discovery {
            message: message.into(),
        }
    }

    /// Creates an invalid address error.
    pub fn invalid_address(address: impl fmt::Display) -> Self {
        CircoError::InvalidAddress {
            address: address.to_string(),
        }
    }

    /// Creates an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        CircoError::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a connection error with a source.
    pub fn connection_with_source(
        target: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        CircoError::Connection {
            target: target.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Error details for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Additional context fields.
    #[serde(flatten)]
    pub fields: HashMap<String, serde_json::Value>,
}

impl ErrorDetails {
    /// Creates empty error details.
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
        }
    }

    /// Adds a field to the error details.
    pub fn with_field(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

impl Default for ErrorDetails {
    fn default() -> Self {
        Self::new()
    }
}

/// Error response structure for the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "E001").
    pub code: ErrorCode,

    /// Human-readable error message.
    pub message: String,

    /// Additional error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

impl ErrorResponse {
    /// Creates a new error response.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an error response from a CircoError.
    pub fn from_error(error: &CircoError) -> Self {
        let code = error.code();
        let message = error.to_string();

        let details = match error {
            CircoError::ServiceNotFound { service } => Some(
                ErrorDetails::new()
                    .with_field("service", service.clone())
                    .with_field("suggestion", "Check the service catalog for the name"),
            ),
            CircoError::Launch { command, .. } => {
                Some(ErrorDetails::new().with_field("command", command.clone()))
            }
            CircoError::Terminate { pid, .. } => {
                Some(ErrorDetails::new().with_field("pid", *pid))
            }
            CircoError::Notification { peer, .. } => {
                Some(ErrorDetails::new().with_field("peer", peer.clone()))
            }
            _ => None,
        };

        Self {
            code,
            message,
            details,
        }
    }
}

/// Result type alias for circo operations.
pub type Result<T> = std::result::Result<T, CircoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::ConfigInvalid.as_str(), "E001");
        assert_eq!(ErrorCode::ServiceNotFound.as_str(), "E002");
        assert_eq!(ErrorCode::LaunchFailed.as_str(), "E003");
        assert_eq!(ErrorCode::TerminateFailed.as_str(), "E004");
        assert_eq!(ErrorCode::ObservationFailed.as_str(), "E005");
        assert_eq!(ErrorCode::NotificationFailed.as_str(), "E006");
        assert_eq!(ErrorCode::DiscoveryFailed.as_str(), "E007");
        assert_eq!(ErrorCode::InvalidAddress.as_str(), "E008");
        assert_eq!(ErrorCode::InvalidRequest.as_str(), "E009");
    }

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::ServiceNotFound.http_status(), 404);
        assert_eq!(ErrorCode::LaunchFailed.http_status(), 500);
        assert_eq!(ErrorCode::NotificationFailed.http_status(), 502);
        assert_eq!(ErrorCode::InvalidAddress.http_status(), 400);
        assert_eq!(ErrorCode::InvalidRequest.http_status(), 400);
    }

    #[test]
    fn test_circo_error_code() {
        let err = CircoError::ServiceNotFound {
            service: "mpd".to_string(),
        };
        assert_eq!(err.code(), ErrorCode::ServiceNotFound);

        let err = CircoError::config("bad yaml");
        assert_eq!(err.code(), ErrorCode::ConfigInvalid);

        let err = CircoError::launch("/bin/sleep 100", "no such file");
        assert_eq!(err.code(), ErrorCode::LaunchFailed);

        let err = CircoError::terminate(42, "gone");
        assert_eq!(err.code(), ErrorCode::TerminateFailed);
    }

    #[test]
    fn test_circo_error_exit_code() {
        let err = CircoError::config("bad yaml");
        assert_eq!(err.exit_code(), exit_code::CONFIG_ERROR);

        let err = CircoError::notification("192.168.1.20", "timed out");
        assert_eq!(err.exit_code(), exit_code::CONNECTION_ERROR);

        let err = CircoError::invalid_request("missing mac");
        assert_eq!(err.exit_code(), exit_code::GENERAL_ERROR);
    }

    #[test]
    fn test_error_response_from_error() {
        let err = CircoError::ServiceNotFound {
            service: "mpd".to_string(),
        };
        let response = ErrorResponse::from_error(&err);

        assert_eq!(response.code, ErrorCode::ServiceNotFound);
        assert!(response.message.contains("mpd"));

        let details = response.details.unwrap();
        assert_eq!(
            details.fields.get("service"),
            Some(&serde_json::Value::String("mpd".to_string()))
        );
    }

    #[test]
    fn test_error_response_serialization() {
        let response = ErrorResponse::new(ErrorCode::ServiceNotFound, "Service not found: mpd");
        let json = serde_json::to_string(&response).unwrap();

        assert!(json.contains("\"code\":\"E002\""));
        assert!(json.contains("Service not found: mpd"));
    }

    #[test]
    fn test_error_display() {
        let err = CircoError::launch("/bin/sleep 100", "permission denied");
        assert_eq!(
            format!("{}", err),
            "Failed to launch '/bin/sleep 100': permission denied"
        );

        let err = CircoError::invalid_address("127.0.0.1");
        assert_eq!(format!("{}", err), "Invalid address: 127.0.0.1");
    }
}

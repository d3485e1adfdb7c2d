//! Circo HTTP client API.
//!
//! This module provides the client for communicating with circo agents.

use crate::error::{CircoError, Result};
use crate::server::response::{ApiResponse, HealthData, ServicesData, StatusData, WakeData, WakeRequest};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Default timeout for HTTP requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Circo HTTP client for communicating with agents.
#[derive(Debug, Clone)]
pub struct CircoClient {
    /// HTTP client.
    client: Client,
    /// Base URL of the target agent.
    base_url: String,
}

impl CircoClient {
    /// Creates a new client for the specified agent URL
    /// (e.g., "http://localhost:9000").
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new client with custom timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CircoError::connection_with_source(&base_url, e))?;

        Ok(Self { client, base_url })
    }

    /// Checks the health of the target agent.
    pub async fn health(&self) -> Result<HealthData> {
        self.get("/api/v1/health").await
    }

    /// Gets the status of the target agent.
    pub async fn status(&self) -> Result<StatusData> {
        self.get("/api/v1/status").await
    }

    /// Lists services and their observed states on the target agent.
    pub async fn services(&self) -> Result<ServicesData> {
        self.get("/api/v1/services").await
    }

    /// Asks the target agent to broadcast a wake packet.
    pub async fn wake(&self, mac: &str) -> Result<WakeData> {
        let url = format!("{}/api/v1/wake", self.base_url);
        debug!(url = %url, mac = %mac, "Sending wake request");

        let response = self
            .client
            .post(&url)
            .json(&WakeRequest {
                mac: mac.to_string(),
            })
            .send()
            .await
            .map_err(|e| CircoError::connection_with_source(&self.base_url, e))?;

        let api_response: ApiResponse<WakeData> = response
            .json()
            .await
            .map_err(|e| CircoError::connection_with_source(&self.base_url, e))?;

        Self::unwrap_response(api_response)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Sending request");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CircoError::connection_with_source(&self.base_url, e))?;

        let api_response: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| CircoError::connection_with_source(&self.base_url, e))?;

        Self::unwrap_response(api_response)
    }

    fn unwrap_response<T>(response: ApiResponse<T>) -> Result<T> {
        if response.success {
            response
                .data
                .ok_or_else(|| CircoError::invalid_request("Response missing data"))
        } else if let Some(err) = response.error {
            Err(CircoError::invalid_request(format!(
                "[{}] {}",
                err.code, err.message
            )))
        } else {
            Err(CircoError::invalid_request("Unknown remote error"))
        }
    }
}

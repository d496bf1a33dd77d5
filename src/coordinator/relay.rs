//! Command relay to devices
//!
//! Each device runs its own small HTTP server. A movement is delivered as
//! `POST /mov` with a plain-text body `<code>,<magnitude>`, for example
//! `r,-30`. The device's response body is handed back untouched.
//!
//! The relay never retries and keeps no state between calls; deciding what
//! to do with a failure is up to the caller.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use super::command::{MovementCommand, MovementKind};

/// Default timeout for a single device call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Build the wire payload for a movement
pub fn wire_payload(kind: MovementKind, magnitude: i64) -> String {
    format!("{},{}", kind.code(), magnitude)
}

/// Delivers movement directives to devices
#[async_trait]
pub trait CommandRelay: Send + Sync {
    /// Send `kind`/`magnitude` to the device at `address`, returning its response body
    async fn relay(
        &self,
        address: &str,
        kind: MovementKind,
        magnitude: i64,
    ) -> Result<String, RelayError>;

    /// Send a queued command to the device at `address`
    async fn relay_command(
        &self,
        address: &str,
        command: &MovementCommand,
    ) -> Result<String, RelayError> {
        self.relay(address, command.kind, command.magnitude()).await
    }
}

// ============================================================================
// HTTP Relay
// ============================================================================

/// Relay speaking plain HTTP to the device's `/mov` endpoint
#[derive(Debug, Clone)]
pub struct HttpRelay {
    client: Client,
}

impl HttpRelay {
    /// Create a relay with the default timeout
    pub fn new() -> Result<Self, RelayError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a relay with a custom per-call timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self, RelayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Init(e.to_string()))?;

        Ok(Self { client })
    }

    /// URL of the device's movement endpoint
    pub fn device_url(address: &str) -> String {
        let address = address.trim_end_matches('/');
        if address.starts_with("http://") || address.starts_with("https://") {
            format!("{address}/mov")
        } else {
            format!("http://{address}/mov")
        }
    }
}

#[async_trait]
impl CommandRelay for HttpRelay {
    async fn relay(
        &self,
        address: &str,
        kind: MovementKind,
        magnitude: i64,
    ) -> Result<String, RelayError> {
        let url = Self::device_url(address);
        let payload = wire_payload(kind, magnitude);

        tracing::debug!(%url, %payload, "Relaying movement to device");

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/text")
            .body(payload)
            .send()
            .await
            .map_err(|e| RelayError::Network {
                address: address.to_string(),
                cause: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| RelayError::Network {
            address: address.to_string(),
            cause: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(RelayError::Status {
                address: address.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Failure talking to a device
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// Connection, timeout or body read failure
    #[error("Relay to {address} failed: {cause}")]
    Network { address: String, cause: String },

    /// The device answered with a non-success status
    #[error("Device at {address} answered {status}: {body}")]
    Status {
        address: String,
        status: u16,
        body: String,
    },

    /// The HTTP client could not be built
    #[error("Relay initialization failed: {0}")]
    Init(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_payload() {
        assert_eq!(wire_payload(MovementKind::Forward, 10), "f,10");
        assert_eq!(wire_payload(MovementKind::Backward, 3), "b,3");
        assert_eq!(wire_payload(MovementKind::Rotate, -30), "r,-30");
    }

    #[test]
    fn test_device_url() {
        assert_eq!(HttpRelay::device_url("10.0.0.5"), "http://10.0.0.5/mov");
        assert_eq!(HttpRelay::device_url("10.0.0.5:8080"), "http://10.0.0.5:8080/mov");
        assert_eq!(
            HttpRelay::device_url("http://127.0.0.1:9000/"),
            "http://127.0.0.1:9000/mov"
        );
    }

    #[test]
    fn test_relay_creation() {
        assert!(HttpRelay::new().is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_device_is_network_error() {
        let relay = HttpRelay::with_timeout(Duration::from_millis(500)).unwrap();

        let result = relay.relay("127.0.0.1:1", MovementKind::Forward, 1).await;
        assert!(matches!(result, Err(RelayError::Network { .. })));
    }
}

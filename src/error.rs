//! Unified error handling for the botfleet crate
//!
//! Each coordinator component has its own error enum. This module folds
//! them into a single [`Error`] for code that crosses component boundaries
//! (the HTTP layer, the binary), and classifies them with [`ErrorCategory`].
//!
//! # Architecture
//!
//! - [`FleetErrorTrait`] - Common interface implemented by the unified error
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

pub use crate::coordinator::api::DecodeError;
pub use crate::coordinator::config::ConfigError;
pub use crate::coordinator::dispatcher::DispatchError;
pub use crate::coordinator::queue::QueueError;
pub use crate::coordinator::registry::RegistryError;
pub use crate::coordinator::relay::RelayError;
pub use crate::coordinator::server::ServerError;

/// Common trait for botfleet error types
pub trait FleetErrorTrait: std::error::Error {
    /// Check if retrying the same operation later could succeed
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed client input
    Decode,
    /// Unknown device or bad registration
    Registry,
    /// Queue unavailable (shutdown)
    Queue,
    /// Talking to a device failed
    Network,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Short label for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decode => "decode",
            Self::Registry => "registry",
            Self::Queue => "queue",
            Self::Network => "network",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}

/// Unified error type for the botfleet crate
#[derive(Error, Debug)]
pub enum Error {
    /// Request body could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Registry lookup or registration failed
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Movement queue refused the operation
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Device relay failed
    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Server startup or serving failed
    #[error("Server error: {0}")]
    Server(#[from] ServerError),
}

impl From<DispatchError> for Error {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Registry(e) => Self::Registry(e),
            DispatchError::Relay(e) => Self::Relay(e),
        }
    }
}

impl FleetErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Decode(_) => false,
            // The device may register later
            Self::Registry(RegistryError::NotFound(_)) => true,
            Self::Registry(RegistryError::InvalidAddress(_)) => false,
            Self::Queue(_) => false,
            Self::Relay(RelayError::Init(_)) => false,
            Self::Relay(_) => true,
            Self::Config(_) => false,
            Self::Server(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Decode(_) => ErrorCategory::Decode,
            Self::Registry(_) => ErrorCategory::Registry,
            Self::Queue(_) => ErrorCategory::Queue,
            Self::Relay(_) => ErrorCategory::Network,
            Self::Config(_) => ErrorCategory::Config,
            Self::Server(_) => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// HTTP status used when this error ends a request
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Decode(_) => StatusCode::BAD_REQUEST,
            Self::Registry(RegistryError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Registry(RegistryError::InvalidAddress(_)) => StatusCode::BAD_REQUEST,
            Self::Queue(QueueError::ShuttingDown) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Relay(_) => StatusCode::BAD_GATEWAY,
            Self::Queue(QueueError::ZeroCapacity)
            | Self::Config(_)
            | Self::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(category = self.category().as_str(), "Request failed: {self}");
        } else {
            tracing::warn!(category = self.category().as_str(), "Request rejected: {self}");
        }
        (status, self.to_string()).into_response()
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

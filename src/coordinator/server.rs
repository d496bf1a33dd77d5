//! Coordinator server implementation
//!
//! This module wires the registry, the movement queue and the dispatcher
//! behind the HTTP router and owns the shutdown signal.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::api::create_router;
use super::config::{ConfigError, CoordinatorConfig};
use super::dispatcher::{DispatchStats, Dispatcher};
use super::queue::{MovementQueue, QueueError};
use super::registry::DeviceRegistry;
use super::relay::{CommandRelay, HttpRelay, RelayError};
use super::shutdown::ShutdownHandle;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Device registry
    pub registry: Arc<DeviceRegistry>,

    /// Pending movement commands
    pub queue: Arc<MovementQueue>,

    /// Shutdown signal owner
    pub shutdown: Arc<ShutdownHandle>,

    /// Configuration
    pub config: CoordinatorConfig,
}

impl AppState {
    /// Build fresh state for a configuration
    pub fn new(config: CoordinatorConfig) -> Result<Self, ServerError> {
        config.validate()?;

        let shutdown = Arc::new(ShutdownHandle::new());
        let queue = Arc::new(MovementQueue::new(config.queue_capacity, shutdown.signal())?);

        Ok(Self {
            registry: Arc::new(DeviceRegistry::new()),
            queue,
            shutdown,
            config,
        })
    }
}

// ============================================================================
// Coordinator Server
// ============================================================================

/// Main Coordinator server
pub struct CoordinatorServer {
    config: CoordinatorConfig,
    state: AppState,
}

impl CoordinatorServer {
    /// Create a new coordinator server
    pub fn new(config: CoordinatorConfig) -> Result<Self, ServerError> {
        let state = AppState::new(config.clone())?;
        Ok(Self { config, state })
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        // Add tracing layer if enabled
        if self.config.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        // Request ids are set outermost so the trace span and the response both see them
        router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Spawn a dispatcher draining the queue into `relay`
    pub fn spawn_dispatcher(&self, relay: Arc<dyn CommandRelay>) -> JoinHandle<DispatchStats> {
        let dispatcher = Dispatcher::new(
            self.state.registry.clone(),
            self.state.queue.clone(),
            relay,
        );
        tokio::spawn(dispatcher.run())
    }

    /// Bind the configured address and serve until `shutdown_signal` resolves
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let addr = self.config.bind_address;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(format!("{addr}: {e}")))?;

        self.serve(listener, shutdown_signal).await
    }

    /// Serve on an already bound listener until `shutdown_signal` resolves
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown_signal: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::Bind(e.to_string()))?;
        tracing::info!("Starting Coordinator server on {}", local_addr);

        let dispatcher = if self.config.enable_dispatch {
            let relay = HttpRelay::with_timeout(self.config.relay_timeout())?;
            Some(self.spawn_dispatcher(Arc::new(relay)))
        } else {
            tracing::info!("Dispatcher disabled; queued movements will not be relayed");
            None
        };

        // Queue waiters must be released before axum waits for in-flight requests
        let shutdown = self.state.shutdown.clone();
        let graceful = async move {
            shutdown_signal.await;
            shutdown.trigger();
        };

        let served = axum::serve(listener, self.build_router())
            .with_graceful_shutdown(graceful)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()));

        // Also stop the dispatcher when serving failed
        self.state.shutdown.trigger();
        if let Some(handle) = dispatcher {
            match handle.await {
                Ok(stats) => tracing::info!(?stats, "Dispatcher finished"),
                Err(e) => tracing::warn!("Dispatcher task failed: {e}"),
            }
        }

        served?;
        tracing::info!("Coordinator server shutdown complete");
        Ok(())
    }

    /// Get server info
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            bind_address: self.config.bind_address,
            queue_capacity: self.config.queue_capacity,
            relay_timeout_ms: self.config.relay_timeout_ms,
            dispatch_enabled: self.config.enable_dispatch,
            request_logging_enabled: self.config.enable_request_logging,
        }
    }
}

/// Server information
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub bind_address: SocketAddr,
    pub queue_capacity: usize,
    pub relay_timeout_ms: u64,
    pub dispatch_enabled: bool,
    pub request_logging_enabled: bool,
}

impl ServerInfo {
    /// Format as display string
    pub fn display(&self) -> String {
        format!(
            "Coordinator Server\n\
             {:-<40}\n\
             Bind Address: {}\n\
             Queue Capacity: {}\n\
             Relay Timeout: {}ms\n\
             Dispatcher: {}\n\
             Request Logging: {}",
            "",
            self.bind_address,
            self.queue_capacity,
            self.relay_timeout_ms,
            if self.dispatch_enabled { "enabled" } else { "disabled" },
            if self.request_logging_enabled { "enabled" } else { "disabled" }
        )
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Server errors
#[derive(Error, Debug, Clone)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Queue could not be created
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Relay could not be created
    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    /// Failed to bind to address
    #[error("Failed to bind: {0}")]
    Bind(String),

    /// Server error
    #[error("Server error: {0}")]
    Serve(String),
}

// ============================================================================
// Tests
// ============================================================================

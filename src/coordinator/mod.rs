//! Coordinator for a fleet of networked robots
//!
//! Devices register themselves, get a logical ID and have their clock
//! offset recorded. Movement directives addressed to those IDs are queued
//! and relayed to the devices' own HTTP endpoints.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │            Coordinator Server            │
//! │                                          │
//! │  POST /reg ──► DeviceRegistry            │
//! │                 - address -> id          │
//! │                 - clock offset           │
//! │                                          │
//! │  POST /mov ──► MovementQueue (bounded)   │
//! │                      │                   │
//! │                      ▼                   │
//! │                 Dispatcher ──► resolve   │
//! │                      │                   │
//! │                      ▼                   │
//! │                 CommandRelay ──► device  │
//! │                   POST /mov "r,-30"      │
//! └──────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use botfleet::coordinator::{CoordinatorServer, CoordinatorConfig};
//!
//! let config = CoordinatorConfig::default();
//! let server = CoordinatorServer::new(config)?;
//! server.start_with_shutdown(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//! ```

pub mod api;
pub mod clock;
pub mod command;
pub mod config;
pub mod dispatcher;
pub mod queue;
pub mod registry;
pub mod relay;
pub mod server;
pub mod shutdown;

// Re-export main types
pub use command::{MovementCommand, MovementKind};
pub use config::CoordinatorConfig;
pub use dispatcher::{DispatchStats, Dispatcher};
pub use queue::MovementQueue;
pub use registry::{Device, DeviceId, DeviceRegistry};
pub use relay::{CommandRelay, HttpRelay};
pub use server::{AppState, CoordinatorServer};
pub use shutdown::{ShutdownHandle, ShutdownSignal};

//! botfleet - Robot fleet coordinator
//!
//! Registers networked robots, keeps a per-device clock offset and relays
//! movement directives to them.
//!
//! # Architecture
//!
//! - [`coordinator`] - Registry, clock offsets, movement queue, relay and HTTP server
//! - [`error`] - Unified error type
//!
//! # Example
//!
//! ```no_run
//! use botfleet::coordinator::{CoordinatorConfig, CoordinatorServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CoordinatorConfig::builder().port(8042).build()?;
//!     let server = CoordinatorServer::new(config)?;
//!     server
//!         .start_with_shutdown(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod coordinator;
pub mod error;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::coordinator::{
        CommandRelay, CoordinatorConfig, CoordinatorServer, Device, DeviceId, DeviceRegistry,
        MovementCommand, MovementKind, MovementQueue,
    };
    pub use crate::error::{Error, ErrorCategory, FleetErrorTrait, Result};
}

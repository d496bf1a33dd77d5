//! Dispatcher draining the movement queue
//!
//! Each command is resolved to a device address and relayed once. Unknown
//! targets and relay failures are logged and the command is dropped; there
//! is no retry.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use super::command::MovementCommand;
use super::queue::{MovementQueue, QueueError};
use super::registry::{DeviceRegistry, RegistryError};
use super::relay::{CommandRelay, RelayError};

/// Counters for one dispatcher run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub relayed: u64,
    pub unknown_target: u64,
    pub relay_failed: u64,
    /// Commands still queued when shutdown stopped the run
    pub discarded: u64,
}

/// Consumer of the movement queue
pub struct Dispatcher {
    registry: Arc<DeviceRegistry>,
    queue: Arc<MovementQueue>,
    relay: Arc<dyn CommandRelay>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        queue: Arc<MovementQueue>,
        relay: Arc<dyn CommandRelay>,
    ) -> Self {
        Self {
            registry,
            queue,
            relay,
        }
    }

    /// Resolve and relay a single command
    pub async fn dispatch(&self, command: &MovementCommand) -> Result<String, DispatchError> {
        let address = self.registry.resolve(command.target_id).await?;
        let body = self.relay.relay_command(&address, command).await?;
        Ok(body)
    }

    /// Drain the queue until shutdown
    pub async fn run(self) -> DispatchStats {
        let mut stats = DispatchStats::default();
        tracing::info!("Dispatcher started");

        loop {
            let command = match self.queue.dequeue().await {
                Ok(command) => command,
                Err(QueueError::ShuttingDown) | Err(QueueError::ZeroCapacity) => break,
            };

            match self.dispatch(&command).await {
                Ok(body) => {
                    stats.relayed += 1;
                    tracing::info!(
                        target_id = command.target_id,
                        kind = %command.kind,
                        response = %body,
                        "Movement relayed"
                    );
                }
                Err(DispatchError::Registry(e)) => {
                    stats.unknown_target += 1;
                    tracing::warn!(target_id = command.target_id, "Dropping movement: {e}");
                }
                Err(DispatchError::Relay(e)) => {
                    stats.relay_failed += 1;
                    tracing::warn!(target_id = command.target_id, "Dropping movement: {e}");
                }
            }
        }

        let pending = self.queue.len();
        if pending > 0 {
            stats.discarded = pending as u64;
            tracing::warn!(pending, "Discarding queued movements on shutdown");
        }

        tracing::info!(?stats, "Dispatcher stopped");
        stats
    }
}

/// Why a command could not be delivered
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Relay(#[from] RelayError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::command::MovementKind;
    use crate::coordinator::shutdown::ShutdownHandle;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Relay that records calls and fails for one address
    #[derive(Default)]
    struct RecordingRelay {
        calls: Mutex<Vec<(String, MovementKind, i64)>>,
        failing: Option<String>,
    }

    #[async_trait]
    impl CommandRelay for RecordingRelay {
        async fn relay(
            &self,
            address: &str,
            kind: MovementKind,
            magnitude: i64,
        ) -> Result<String, RelayError> {
            if self.failing.as_deref() == Some(address) {
                return Err(RelayError::Status {
                    address: address.to_string(),
                    status: 500,
                    body: String::new(),
                });
            }
            self.calls
                .lock()
                .unwrap()
                .push((address.to_string(), kind, magnitude));
            Ok("ok".to_string())
        }
    }

    #[tokio::test]
    async fn test_dispatch_unknown_target() {
        let handle = ShutdownHandle::new();
        let registry = Arc::new(DeviceRegistry::new());
        let queue = Arc::new(MovementQueue::new(2, handle.signal()).unwrap());
        let dispatcher = Dispatcher::new(registry, queue, Arc::new(RecordingRelay::default()));

        let result = dispatcher
            .dispatch(&MovementCommand::new(5, MovementKind::Forward))
            .await;
        assert_eq!(result, Err(DispatchError::Registry(RegistryError::NotFound(5))));
    }

    #[tokio::test]
    async fn test_run_relays_until_shutdown() {
        let handle = ShutdownHandle::new();
        let registry = Arc::new(DeviceRegistry::new());
        registry.register("10.0.0.5", 0, 0).await.unwrap();
        registry.register("10.0.0.6", 0, 0).await.unwrap();

        let queue = Arc::new(MovementQueue::new(4, handle.signal()).unwrap());
        let relay = Arc::new(RecordingRelay {
            failing: Some("10.0.0.6".to_string()),
            ..Default::default()
        });

        queue
            .enqueue(MovementCommand::new(0, MovementKind::Rotate).with_rotation(-30.0))
            .await
            .unwrap();
        queue
            .enqueue(MovementCommand::new(1, MovementKind::Forward))
            .await
            .unwrap();
        queue
            .enqueue(MovementCommand::new(9, MovementKind::Backward))
            .await
            .unwrap();

        let task = tokio::spawn(Dispatcher::new(registry, queue.clone(), relay.clone()).run());

        while !queue.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.trigger();

        let stats = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("dispatcher should stop")
            .unwrap();

        assert_eq!(
            stats,
            DispatchStats {
                relayed: 1,
                unknown_target: 1,
                relay_failed: 1,
                discarded: 0,
            }
        );
        let calls = relay.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[("10.0.0.5".to_string(), MovementKind::Rotate, -30)]);
    }

    #[tokio::test]
    async fn test_run_counts_commands_left_at_shutdown() {
        let handle = ShutdownHandle::new();
        let registry = Arc::new(DeviceRegistry::new());
        registry.register("10.0.0.5", 0, 0).await.unwrap();

        let queue = Arc::new(MovementQueue::new(4, handle.signal()).unwrap());
        queue
            .enqueue(MovementCommand::new(0, MovementKind::Forward))
            .await
            .unwrap();
        queue
            .enqueue(MovementCommand::new(0, MovementKind::Backward))
            .await
            .unwrap();
        handle.trigger();

        let relay = Arc::new(RecordingRelay::default());
        let stats = Dispatcher::new(registry, queue, relay.clone()).run().await;

        assert_eq!(stats.discarded, 2);
        assert_eq!(stats.relayed, 0);
        assert!(relay.calls.lock().unwrap().is_empty());
    }
}

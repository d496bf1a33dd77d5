//! Bounded movement command queue
//!
//! Sits between the HTTP producer and the dispatcher. A full queue makes
//! producers wait; there is no drop policy and no "queue full" error.
//! Both wait points give up with [`QueueError::ShuttingDown`] once the
//! coordinator shutdown signal fires.

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

use super::command::MovementCommand;
use super::shutdown::ShutdownSignal;

/// Default capacity, sized for the expected fleet
pub const DEFAULT_CAPACITY: usize = 2;

/// Bounded FIFO of pending movement commands
#[derive(Debug)]
pub struct MovementQueue {
    sender: mpsc::Sender<MovementCommand>,
    receiver: Mutex<mpsc::Receiver<MovementCommand>>,
    shutdown: ShutdownSignal,
}

impl MovementQueue {
    /// Create a queue holding at most `capacity` commands
    pub fn new(capacity: usize, shutdown: ShutdownSignal) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::ZeroCapacity);
        }

        let (sender, receiver) = mpsc::channel(capacity);
        Ok(Self {
            sender,
            receiver: Mutex::new(receiver),
            shutdown,
        })
    }

    /// Add a command, waiting for a free slot while the queue is full
    pub async fn enqueue(&self, command: MovementCommand) -> Result<(), QueueError> {
        let mut shutdown = self.shutdown.clone();
        if shutdown.is_triggered() {
            return Err(QueueError::ShuttingDown);
        }

        let sent = tokio::select! {
            biased;
            _ = shutdown.wait() => Err(QueueError::ShuttingDown),
            sent = self.sender.send(command) => sent.map_err(|_| QueueError::ShuttingDown),
        };
        sent?;

        tracing::debug!(pending = self.len(), "Movement command queued");
        Ok(())
    }

    /// Take the oldest command, waiting while the queue is empty
    pub async fn dequeue(&self) -> Result<MovementCommand, QueueError> {
        let mut shutdown = self.shutdown.clone();
        if shutdown.is_triggered() {
            return Err(QueueError::ShuttingDown);
        }

        let mut receiver = tokio::select! {
            biased;
            _ = shutdown.wait() => return Err(QueueError::ShuttingDown),
            guard = self.receiver.lock() => guard,
        };

        tokio::select! {
            biased;
            _ = shutdown.wait() => Err(QueueError::ShuttingDown),
            command = receiver.recv() => command.ok_or(QueueError::ShuttingDown),
        }
    }

    /// Maximum number of pending commands
    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }

    /// Number of commands waiting for dispatch
    pub fn len(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    /// Whether nothing is waiting
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Queue errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The coordinator is shutting down
    #[error("Coordinator is shutting down")]
    ShuttingDown,

    /// A queue must hold at least one command
    #[error("Queue capacity must be at least 1")]
    ZeroCapacity,
}

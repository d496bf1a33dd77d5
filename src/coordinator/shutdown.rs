//! Coordinator-wide shutdown signal

use tokio::sync::watch;

/// Owner side of the shutdown signal
#[derive(Debug)]
pub struct ShutdownHandle {
    sender: watch::Sender<bool>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    /// Create a handle in the running state
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    /// Get a signal that resolves once shutdown is triggered
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.sender.subscribe(),
        }
    }

    /// Trigger shutdown, waking every waiter
    ///
    /// Returns `true` only for the call that flipped the flag.
    pub fn trigger(&self) -> bool {
        let flipped = self.sender.send_if_modified(|triggered| {
            if *triggered {
                return false;
            }
            *triggered = true;
            true
        });
        if flipped {
            tracing::info!("Shutdown triggered");
        }
        flipped
    }

    /// Whether shutdown has been triggered
    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }
}

/// Observer side of the shutdown signal
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Whether shutdown has been triggered
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Wait until shutdown is triggered
    ///
    /// Never resolves if the handle is dropped without triggering.
    pub async fn wait(&mut self) {
        loop {
            if *self.receiver.borrow_and_update() {
                return;
            }
            if self.receiver.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_signal_resolves_after_trigger() {
        let handle = ShutdownHandle::new();
        let mut signal = handle.signal();
        assert!(!signal.is_triggered());

        let waiter = tokio::spawn(async move { signal.wait().await });
        handle.trigger();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
        assert!(handle.is_triggered());
    }

    #[tokio::test]
    async fn test_signal_created_after_trigger() {
        let handle = ShutdownHandle::new();
        handle.trigger();

        let mut signal = handle.signal();
        assert!(signal.is_triggered());
        signal.wait().await;
    }

    #[tokio::test]
    async fn test_trigger_is_idempotent() {
        let handle = ShutdownHandle::new();
        let mut signal = handle.signal();

        assert!(handle.trigger());
        assert!(!handle.trigger());

        signal.wait().await;
        assert!(signal.is_triggered());
    }
}

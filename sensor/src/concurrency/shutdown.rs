//! Broadcast shutdown signal built on a tokio watch channel.

use std::sync::Arc;

use tokio::sync::watch;

/// Transmitter side of the shutdown signal.
///
/// Cloning yields another handle to the same signal.
#[derive(Debug, Clone)]
pub struct ShutdownTx(Arc<watch::Sender<bool>>);

impl ShutdownTx {
    /// Signals shutdown to every receiver.
    ///
    /// Calling it more than once has no further effect.
    pub fn shutdown(&self) {
        self.0.send_replace(true);
    }

    /// Returns `true` once [`ShutdownTx::shutdown`] has been called.
    pub fn is_shutdown(&self) -> bool {
        *self.0.borrow()
    }

    /// Creates a new receiver observing this signal.
    ///
    /// A receiver created after the signal was sent sees it immediately.
    pub fn subscribe(&self) -> ShutdownRx {
        ShutdownRx(self.0.subscribe())
    }
}

/// Receiver side of the shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownRx(watch::Receiver<bool>);

impl ShutdownRx {
    /// Waits until shutdown is signalled.
    ///
    /// Resolves immediately when the signal was already sent, and also when every
    /// [`ShutdownTx`] has been dropped since nobody could signal it anymore.
    pub async fn wait(&mut self) {
        // An error means all senders are gone, which is treated as shutdown.
        let _ = self.0.wait_for(|shutdown| *shutdown).await;
    }

    /// Returns `true` if shutdown has been signalled.
    pub fn is_shutdown(&self) -> bool {
        *self.0.borrow()
    }
}

/// Creates a new shutdown signal in the running state.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTx(Arc::new(tx)), ShutdownRx(rx))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn wait_resolves_after_shutdown() {
        let (tx, mut rx) = create_shutdown_channel();
        assert!(!rx.is_shutdown());

        let waiter = tokio::spawn(async move {
            rx.wait().await;
            rx.is_shutdown()
        });

        tx.shutdown();
        let observed = timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(observed);
    }

    #[tokio::test]
    async fn late_subscribers_see_previous_shutdown() {
        let (tx, _rx) = create_shutdown_channel();
        tx.shutdown();
        tx.shutdown();

        let mut late = tx.subscribe();
        assert!(late.is_shutdown());
        timeout(Duration::from_millis(100), late.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn dropping_every_sender_releases_waiters() {
        let (tx, mut rx) = create_shutdown_channel();
        let other = tx.clone();

        drop(tx);
        drop(other);

        timeout(Duration::from_millis(100), rx.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn wait_pends_while_running() {
        let (tx, mut rx) = create_shutdown_channel();

        assert!(
            timeout(Duration::from_millis(20), rx.wait())
                .await
                .is_err()
        );
        assert!(!tx.is_shutdown());
    }
}

use std::time::Duration;

use tokio::sync::watch;

/// A shutdown signal that supports interruptible waits.
///
/// Long-running scans poll [`is_shutdown`](Self::is_shutdown) between chunks;
/// async input sequences use [`wait`](Self::wait), which returns as soon as
/// the signal fires instead of sleeping out the full duration.
#[derive(Debug)]
pub struct ShutdownSignal {
    tx: watch::Sender<bool>,
}

impl ShutdownSignal {
    /// Create a new shutdown signal in the non-shutdown state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Trigger the shutdown signal, waking all waiting tasks.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Check if shutdown has been triggered.
    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait for the specified duration or until shutdown is triggered.
    ///
    /// Returns `true` if shutdown was triggered, `false` if the wait completed normally.
    pub async fn wait(&self, duration: Duration) -> bool {
        if self.is_shutdown() {
            return true;
        }

        let mut rx = self.tx.subscribe();
        tokio::select! {
            _ = tokio::time::sleep(duration) => self.is_shutdown(),
            triggered = rx.wait_for(|shutdown| *shutdown) => triggered.is_ok(),
        }
    }

    /// Resolve once shutdown has been triggered.
    pub async fn triggered(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|shutdown| *shutdown).await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_initial_state() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_shutdown());
    }

    #[test]
    fn test_trigger() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        assert!(signal.is_shutdown());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_timeout() {
        let signal = ShutdownSignal::new();
        let start = tokio::time::Instant::now();
        let interrupted = signal.wait(Duration::from_millis(50)).await;

        assert!(!interrupted);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_interrupted() {
        let signal = Arc::new(ShutdownSignal::new());
        let signal_clone = Arc::clone(&signal);

        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now();
            let interrupted = signal_clone.wait(Duration::from_secs(10)).await;
            (interrupted, start.elapsed())
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        signal.trigger();

        let (interrupted, elapsed) = handle.await.unwrap();
        assert!(interrupted);
        assert!(elapsed < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_wait_already_shutdown() {
        let signal = ShutdownSignal::new();
        signal.trigger();

        let start = std::time::Instant::now();
        let interrupted = signal.wait(Duration::from_secs(10)).await;

        assert!(interrupted);
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Fixed-interval wait between discovery rounds that gives way to shutdown.
#[derive(Clone)]
pub struct RetryScheduler {
    interval: Duration,
    shutdown: CancellationToken,
}

impl RetryScheduler {
    pub fn new(interval: Duration, shutdown: CancellationToken) -> Self {
        Self { interval, shutdown }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleep for the retry interval, or less if shutdown fires first.
    /// Returns `true` when the wait was cut short by shutdown.
    pub async fn wait_and_retry(&self) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.interval) => false,
            _ = self.shutdown.cancelled() => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_waits_full_interval() {
        let scheduler = RetryScheduler::new(Duration::from_millis(50), CancellationToken::new());
        let start = Instant::now();
        assert!(!scheduler.wait_and_retry().await);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_shutdown_cuts_wait_short() {
        let token = CancellationToken::new();
        let scheduler = RetryScheduler::new(Duration::from_secs(60), token.clone());

        let waiter = tokio::spawn(async move { scheduler.wait_and_retry().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        let interrupted = tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .expect("wait should end promptly on shutdown")
            .unwrap();
        assert!(interrupted);
    }

    #[tokio::test]
    async fn test_already_cancelled_returns_immediately() {
        let token = CancellationToken::new();
        token.cancel();
        let scheduler = RetryScheduler::new(Duration::from_secs(60), token);
        assert!(scheduler.wait_and_retry().await);
    }
}

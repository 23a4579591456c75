//! Cooperative cancellation.
//!
//! A [`CancelToken`] is a cloneable flag backed by a `watch` channel.
//! Long-running tasks check it at every loop iteration and race their
//! suspension points against [`CancelToken::cancelled`]. Dropping the raced
//! future is what detaches any listener it registered.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

/// Cloneable, idempotent cancellation signal.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Request cancellation. Calling this more than once is a no-op.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as `self`, so this only returns once the flag is set.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Drive `fut` to completion unless cancellation arrives first.
    ///
    /// Returns `None` when cancelled; `fut` is dropped at that point.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        if self.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => None,
            out = fut => Some(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());

        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());

        let clone = token.clone();
        assert!(clone.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_returns_none_when_cancelled() {
        let token = CancelToken::new();
        let canceller = token.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let result = token
            .run(tokio::time::sleep(Duration::from_secs(60)))
            .await;
        assert!(result.is_none());
    }

    #[test]
    fn test_cancel_wakes_waiter() {
        let token = CancelToken::new();
        let mut waiter = tokio_test::task::spawn(token.cancelled());
        tokio_test::assert_pending!(waiter.poll());

        token.cancel();
        assert!(waiter.is_woken());
        tokio_test::assert_ready!(waiter.poll());
    }

    #[tokio::test]
    async fn test_run_completes_when_not_cancelled() {
        let token = CancelToken::new();
        let result = token.run(async { 42 }).await;
        assert_eq!(result, Some(42));
    }
}

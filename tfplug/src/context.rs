//! Request-scoped cancellation and deadlines
//!
//! Every trait method receives a Context. The server hands out clones of one
//! root context, so StopProvider cancels all in-flight work at once.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    cancel_tx: watch::Sender<bool>,
    cancel_rx: watch::Receiver<bool>,
}

impl Context {
    pub fn new() -> Self {
        Self::build(None)
    }

    fn build(deadline: Option<Instant>) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            inner: Arc::new(ContextInner {
                deadline,
                cancel_tx,
                cancel_rx,
            }),
        }
    }

    /// A new context that cancels itself once `timeout` elapses.
    /// Must be called from within a tokio runtime.
    pub fn with_timeout(timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        let ctx = Self::build(Some(deadline));

        let tx = ctx.inner.cancel_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline.into()).await;
            let _ = tx.send(true);
        });

        ctx
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancel_rx.borrow()
    }

    pub fn cancel(&self) {
        let _ = self.inner.cancel_tx.send(true);
    }

    /// Resolves once the context is cancelled
    pub async fn cancelled(&self) {
        let mut rx = self.inner.cancel_rx.clone();
        // the sender lives as long as self, so wait_for only fails if we are dropped
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn context_timeout_cancels() {
        let ctx = Context::with_timeout(Duration::from_millis(50));
        assert!(!ctx.is_cancelled());
        assert!(ctx.deadline().is_some());

        sleep(Duration::from_millis(100)).await;

        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_is_visible_through_clones() {
        let ctx = Context::new();
        let clone = ctx.clone();
        assert!(ctx.deadline().is_none());

        clone.cancel();

        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_future_resolves() {
        let ctx = Context::new();
        let waiter = ctx.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });

        ctx.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("cancelled() did not resolve")
            .unwrap();
    }
}

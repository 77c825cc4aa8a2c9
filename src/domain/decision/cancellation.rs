//! Cooperative cancellation handle carried by every decision request.

use std::sync::Arc;
use tokio::sync::watch;

/// Cancellation handle shared between a caller and the engine.
///
/// Clones observe the same flag. Once cancelled, a handle stays cancelled.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Creates a handle that is not cancelled.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Signals cancellation to every clone of this handle.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Returns true once `cancel` has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves when the handle is cancelled.
    ///
    /// Resolves immediately if it already is.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            // The sender lives in `self`, so `changed` cannot observe a
            // closed channel while we hold the borrow.
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn new_handle_is_not_cancelled() {
        assert!(!CancelHandle::new().is_cancelled());
    }

    #[test]
    fn cancel_is_visible_to_clones() {
        let handle = CancelHandle::new();
        let clone = handle.clone();

        clone.cancel();

        assert!(handle.is_cancelled());
        assert!(clone.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_immediately_when_already_cancelled() {
        let handle = CancelHandle::new();
        handle.cancel();

        tokio::time::timeout(Duration::from_millis(50), handle.cancelled())
            .await
            .expect("should resolve immediately");
    }

    #[tokio::test]
    async fn cancelled_resolves_after_cancel_from_another_task() {
        let handle = CancelHandle::new();
        let remote = handle.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            remote.cancel();
        });

        tokio::time::timeout(Duration::from_secs(1), handle.cancelled())
            .await
            .expect("should resolve after cancel");
    }

    #[tokio::test]
    async fn cancelled_stays_pending_without_cancel() {
        let handle = CancelHandle::new();
        let result = tokio::time::timeout(Duration::from_millis(20), handle.cancelled()).await;
        assert!(result.is_err());
    }
}

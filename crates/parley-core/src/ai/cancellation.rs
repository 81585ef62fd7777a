//! Cancellation support for chat exchanges
//!
//! Lets a caller on another task stop an exchange that is waiting on the
//! transport or emitting content.

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Wrapper around CancellationToken for exchange cancellation
///
/// One controller is created per exchange and handed to the driver at
/// creation. Clones share the same token.
#[derive(Debug, Clone)]
pub struct CancellationController {
    token: CancellationToken,
}

impl CancellationController {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Request cancellation. Repeated calls and calls after completion are no-ops.
    pub fn request_cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once cancellation is requested
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

impl Default for CancellationController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cancel_is_idempotent() {
        let controller = CancellationController::new();
        assert!(!controller.is_cancelled());
        controller.request_cancel();
        controller.request_cancel();
        assert!(controller.is_cancelled());
    }

    #[tokio::test]
    async fn test_clone_wakes_waiter() {
        let controller = CancellationController::new();
        let remote = controller.clone();
        let waiter = tokio::spawn(async move { controller.cancelled().await });
        remote.request_cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}

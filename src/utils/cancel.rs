//! Cancellation utilities
//!
//! Provides first-class cancellation handles for long-running operations.
//! A handle is passed alongside a request and checked at every suspension
//! point (dispatch, token refresh, retry delay).

use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::error::{HttpClientError, Result};

/// A handle that can be used to request cancellation.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    /// Create a new cancel handle.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Request cancellation. Operations observing this handle stop at their
    /// next check and surface `HttpClientError::Cancelled`.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A future that resolves when cancellation is requested.
    pub fn cancelled(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// A handle cancelled together with this one, but cancellable on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    /// `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(HttpClientError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Drive `future` unless cancellation wins the race. The future is dropped
    /// on cancellation, which aborts any in-flight I/O it owns.
    pub async fn run<F, T>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(HttpClientError::Cancelled),
            res = future => res,
        }
    }
}

/// Create a standalone cancel handle that can be shared across tasks.
pub fn new_cancel_handle() -> CancelHandle {
    CancelHandle::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancel_wakes_pending_run_immediately() {
        let cancel = new_cancel_handle();
        let waiter = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                cancel
                    .run(async {
                        futures::future::pending::<()>().await;
                        Ok(())
                    })
                    .await
            })
        };

        tokio::task::yield_now().await;
        cancel.cancel();

        let out = tokio::time::timeout(Duration::from_millis(200), waiter)
            .await
            .expect("cancel should wake the waiting task")
            .expect("task ok");
        assert!(matches!(out, Err(HttpClientError::Cancelled)));
    }

    #[test]
    fn child_follows_parent() {
        let parent = CancelHandle::new();
        let child = parent.child();
        assert!(child.check().is_ok());
        parent.cancel();
        assert!(child.is_cancelled());
    }
}

//! Process-wide serialization of administrative operations

use std::future::Future;

use tokio::sync::Mutex;

/// A non-reentrant mutual-exclusion gate for administrative operations
/// (data loads, schema resets): at most one [`perform`] action executes
/// at a time.
///
/// [`try_is_busy`] is an advisory fast path for callers that would rather
/// skip than queue. It is check-then-act by nature; the lock acquisition
/// inside [`perform`] is the actual correctness mechanism.
///
/// [`perform`]: RunLock::perform
/// [`try_is_busy`]: RunLock::try_is_busy
#[derive(Debug, Default)]
pub struct RunLock {
    inner: Mutex<()>,
}

impl RunLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if an action currently holds the lock. Non-blocking.
    pub fn try_is_busy(&self) -> bool {
        self.inner.try_lock().is_err()
    }

    /// Waits for the lock, runs `action` exclusively, and releases the
    /// lock when the action completes or fails. The action's result,
    /// error included, is returned as-is.
    pub async fn perform<F, Fut, T>(&self, action: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.inner.lock().await;
        action().await
    }
}

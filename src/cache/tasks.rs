//! Tracking for detached background tasks.
//!
//! Cache population and invalidation outlive the request that scheduled them.
//! The tracker counts outstanding tasks so shutdown can wait for them to
//! finish (with a bound) instead of dropping pending invalidations.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

/// Handle for spawning tracked fire-and-forget tasks.
///
/// Tasks run on the tokio runtime; a panic inside one is confined to its task
/// and still decrements the outstanding count.
#[derive(Clone)]
pub struct TaskTracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    outstanding: AtomicUsize,
    idle: Notify,
}

struct TaskGuard {
    inner: Arc<TrackerInner>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if self.inner.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

impl TaskTracker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                outstanding: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    /// Spawn a detached task counted until completion or panic.
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.outstanding.fetch_add(1, Ordering::SeqCst);
        let guard = TaskGuard {
            inner: self.inner.clone(),
        };
        tokio::spawn(async move {
            let _guard = guard;
            future.await;
        });
    }

    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::SeqCst)
    }

    /// Wait until every tracked task finishes, up to `limit`.
    ///
    /// Returns true when the tracker drained, false on timeout with tasks
    /// still outstanding.
    pub async fn drain(&self, limit: Duration) -> bool {
        tokio::time::timeout(limit, async {
            loop {
                // Register before checking so a completion between the check
                // and the await cannot be missed.
                let notified = self.inner.idle.notified();
                if self.inner.outstanding.load(Ordering::SeqCst) == 0 {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}

impl Default for TaskTracker {
    fn default() -> Self {
        Self::new()
    }
}

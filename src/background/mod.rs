//! Background tasks — work that keeps running after a response is released.
//!
//! A [`TaskQueue`] is the host's "run after the response is sent" hook. When a
//! [`Pipeline`](crate::middleware::Pipeline) is configured with one, every
//! request's [`Context`](crate::context::Context) carries a clone of it, and
//! middleware may hand it futures that must not hold up the response.
//!
//! Tasks are tracked so the host can wait for in-flight work before shutting
//! down; see [`TaskQueue::drain`].

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;
use tracing::debug;

/// Cheaply-cloneable handle for spawning request-independent work.
///
/// All clones share one tracker, so [`pending`](Self::pending) and
/// [`drain`](Self::drain) see tasks spawned through any of them.
///
/// Must be used from within a Tokio runtime.
///
/// # Examples
///
/// ```rust
/// use response_cache::background::TaskQueue;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let queue = TaskQueue::new();
/// queue.spawn(async {
///     // write-back, audit log, ...
/// });
/// queue.drain().await;
/// assert_eq!(queue.pending(), 0);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct TaskQueue {
    tracker: TaskTracker,
    // Serializes drains so one caller's reopen cannot land inside another's wait.
    draining: Arc<Mutex<()>>,
}

impl TaskQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            tracker: TaskTracker::new(),
            draining: Arc::new(Mutex::new(())),
        }
    }

    /// Spawns `task` onto the current runtime. The caller does not wait for it.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(task);
    }

    /// Returns the number of spawned tasks that have not finished yet.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Waits until every task spawned so far has finished.
    ///
    /// The queue stays usable afterwards; tasks spawned while draining are
    /// waited for as well. Concurrent drains, from any clone, run one at a time.
    pub async fn drain(&self) {
        let _guard = self.draining.lock().await;
        debug!(pending = self.tracker.len(), "draining background tasks");
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn drain_waits_for_spawned_tasks() {
        let queue = TaskQueue::new();
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let done = Arc::clone(&done);
            queue.spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }

        queue.drain().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn clones_share_the_tracker() {
        let queue = TaskQueue::new();
        let handle = queue.clone();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        handle.spawn(async move {
            let _ = rx.await;
        });
        assert_eq!(queue.pending(), 1);

        tx.send(()).unwrap();
        queue.drain().await;
        assert_eq!(handle.pending(), 0);
    }

    #[tokio::test]
    async fn usable_after_drain() {
        let queue = TaskQueue::new();
        queue.drain().await;

        let done = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&done);
        queue.spawn(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        queue.drain().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn overlapping_drains_both_finish() {
        let queue = TaskQueue::new();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        queue.spawn(async move {
            let _ = rx.await;
        });

        let first = tokio::spawn({
            let queue = queue.clone();
            async move { queue.drain().await }
        });
        let second = tokio::spawn({
            let queue = queue.clone();
            async move { queue.drain().await }
        });
        tokio::task::yield_now().await;
        tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            first.await.unwrap();
            second.await.unwrap();
        })
        .await
        .expect("both drains return once the task is done");
        assert_eq!(queue.pending(), 0);
    }
}

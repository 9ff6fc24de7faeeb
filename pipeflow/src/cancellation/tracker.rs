//! Tracking of live stage tasks.

use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Keeps count of live stage tasks and their join handles.
///
/// A stage counts as live from the moment its slot is reserved until its
/// task body has returned, whether it finished, was cancelled, or panicked.
#[derive(Default)]
pub struct StageTracker {
    /// Number of reserved slots, spawned or not.
    active: Arc<AtomicUsize>,
    /// Handles to spawned tasks that have not been joined yet.
    handles: Mutex<Vec<(String, JoinHandle<()>)>>,
    /// Panics collected while joining.
    failures: RwLock<Vec<(String, String)>>,
}

/// A reserved place in the live count.
///
/// Released when dropped, so a slot that never gets a task gives its place
/// back, and a spawned task releases it when its body ends.
#[derive(Debug)]
pub struct StageSlot(Arc<AtomicUsize>);

impl Drop for StageSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Handles taken out of the tracker for one join pass.
///
/// Anything not yet joined goes back to the tracker on drop, so a join
/// abandoned by a timeout leaves its tasks reachable by `abort_all`.
struct JoinBatch<'a> {
    home: &'a Mutex<Vec<(String, JoinHandle<()>)>>,
    pending: VecDeque<(String, JoinHandle<()>)>,
}

impl Drop for JoinBatch<'_> {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            self.home.lock().extend(self.pending.drain(..));
        }
    }
}

impl StageTracker {
    /// Creates a new tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a slot for one more task, unless `limit` slots are taken.
    ///
    /// The check and the increment are one atomic step. On rejection the
    /// current count is returned.
    pub fn try_reserve(&self, limit: Option<usize>) -> Result<StageSlot, usize> {
        self.active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |active| match limit {
                Some(limit) if active >= limit => None,
                _ => Some(active + 1),
            })
            .map(|_| StageSlot(self.active.clone()))
    }

    /// Spawns a task on the given runtime, holding `slot` until it ends.
    pub fn spawn<F>(&self, runtime: &Handle, slot: StageSlot, name: &str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = runtime.spawn(async move {
            let _slot = slot;
            task.await;
        });

        let mut handles = self.handles.lock();
        handles.retain(|(_, h)| !h.is_finished());
        handles.push((name.to_string(), handle));
    }

    /// Returns the number of live stage tasks.
    #[must_use]
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Waits for every spawned stage task to exit.
    ///
    /// Returns the panics observed as `(stage, message)` pairs. Aborted
    /// tasks are not failures. Dropping the returned future early leaves
    /// the unjoined tasks in the tracker.
    pub async fn join_all(&self) -> Vec<(String, String)> {
        loop {
            let mut batch = JoinBatch {
                home: &self.handles,
                pending: std::mem::take(&mut *self.handles.lock()).into(),
            };
            if batch.pending.is_empty() {
                break;
            }

            while let Some((_, handle)) = batch.pending.front_mut() {
                let outcome = handle.await;
                let Some((name, _)) = batch.pending.pop_front() else {
                    break;
                };
                match outcome {
                    Err(join_error) if join_error.is_cancelled() => {
                        debug!(stage = %name, "Task aborted");
                    }
                    Err(join_error) => {
                        let msg = format!("Task join error: {join_error}");
                        warn!(stage = %name, "{}", msg);
                        self.failures.write().push((name, msg));
                    }
                    Ok(()) => {}
                }
            }
        }

        self.failures.read().clone()
    }

    /// Aborts every stage task that is still running.
    ///
    /// Returns how many tasks were signalled. Abort takes effect at the
    /// task's next suspension point; follow with [`join_all`](Self::join_all)
    /// to wait for them.
    pub fn abort_all(&self) -> usize {
        let handles = self.handles.lock();
        let mut aborted = 0;
        for (name, handle) in handles.iter().filter(|(_, h)| !h.is_finished()) {
            debug!(stage = %name, "Aborting task");
            handle.abort();
            aborted += 1;
        }
        aborted
    }
}

impl std::fmt::Debug for StageTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageTracker")
            .field("active", &self.active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::time::Duration;

    fn spawn<F>(tracker: &StageTracker, name: &str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let slot = tracker.try_reserve(None).unwrap();
        tracker.spawn(&Handle::current(), slot, name, task);
    }

    #[tokio::test]
    async fn test_tracker_counts_live_tasks() {
        let tracker = StageTracker::new();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        spawn(&tracker, "blocked", async move {
            let _ = rx.await;
        });
        spawn(&tracker, "quick", async {});

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(tracker.active(), 1);

        tx.send(()).unwrap();
        let failures = tracker.join_all().await;
        assert!(failures.is_empty());
        assert_eq!(tracker.active(), 0);
    }

    #[tokio::test]
    async fn test_tracker_records_panics() {
        let tracker = StageTracker::new();
        spawn(&tracker, "exploding", async {
            panic!("Intentional");
        });

        let failures = tracker.join_all().await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "exploding");
        assert_eq!(tracker.active(), 0);
    }

    #[tokio::test]
    async fn test_abort_all_releases_tasks() {
        let tracker = StageTracker::new();
        spawn(&tracker, "forever", std::future::pending());
        assert_eq!(tracker.active(), 1);

        assert_eq!(tracker.abort_all(), 1);
        let failures = tracker.join_all().await;
        assert!(failures.is_empty());
        assert_eq!(tracker.active(), 0);
    }

    #[tokio::test]
    async fn test_timed_out_join_keeps_handles_for_abort() {
        let tracker = StageTracker::new();
        spawn(&tracker, "forever", std::future::pending());

        let joined = tokio::time::timeout(Duration::from_millis(10), tracker.join_all()).await;
        assert!(joined.is_err());

        // The abandoned join put the handle back
        assert_eq!(tracker.abort_all(), 1);
        tracker.join_all().await;
        assert_eq!(tracker.active(), 0);
    }

    #[test]
    fn test_reserve_respects_limit() {
        let tracker = StageTracker::new();
        let first = tracker.try_reserve(Some(2)).unwrap();
        let _second = tracker.try_reserve(Some(2)).unwrap();
        assert_eq!(tracker.try_reserve(Some(2)).unwrap_err(), 2);

        drop(first);
        assert_eq!(tracker.active(), 1);
        assert!(tracker.try_reserve(Some(2)).is_ok());
    }

    #[test]
    fn test_concurrent_reservations_never_exceed_limit() {
        const LIMIT: usize = 4;
        const THREADS: usize = 16;

        let tracker = StageTracker::new();
        let barrier = Barrier::new(THREADS);
        let granted = Mutex::new(Vec::new());

        std::thread::scope(|scope| {
            for _ in 0..THREADS {
                scope.spawn(|| {
                    barrier.wait();
                    if let Ok(slot) = tracker.try_reserve(Some(LIMIT)) {
                        granted.lock().push(slot);
                    }
                });
            }
        });

        assert_eq!(granted.lock().len(), LIMIT);
        assert_eq!(tracker.active(), LIMIT);
    }
}

//! Background task lifecycle management, generalized from the teacher's
//! unified shutdown coordinator: a `CancellationToken` for hierarchical
//! shutdown signaling plus a `TaskTracker` so every spawned maintenance
//! tick can be awaited out before the process exits.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Owns the cancellation hierarchy and task tracker for every periodic
/// maintenance task (decay, access flush, cache eviction, hash backfill,
/// health polling, mirror reconciliation).
#[derive(Clone)]
pub struct MaintenanceScheduler {
    cancel_token: CancellationToken,
    task_tracker: TaskTracker,
}

impl Default for MaintenanceScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl MaintenanceScheduler {
    /// Build a scheduler with no tasks yet spawned.
    pub fn new() -> Self {
        Self {
            cancel_token: CancellationToken::new(),
            task_tracker: TaskTracker::new(),
        }
    }

    /// A child cancellation token for one task, cancelled whenever the
    /// scheduler as a whole shuts down.
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }

    /// Whether shutdown has been initiated.
    pub fn is_shutting_down(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Number of tasks currently tracked.
    pub fn active_tasks(&self) -> usize {
        self.task_tracker.len()
    }

    /// Spawn a periodic task: `run_once` is invoked every `interval` until
    /// the scheduler is shut down. Ticks never overlap for the same task —
    /// a slow tick simply delays the next one, rather than running
    /// concurrently with itself.
    pub fn spawn_periodic<F, Fut>(&self, name: &'static str, interval: Duration, mut run_once: F) -> JoinHandle<()>
    where
        F: FnMut(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.child_token();
        let future = async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!(task = name, "maintenance task cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        run_once(token.child_token()).await;
                    }
                }
            }
        };
        let tracked = self.task_tracker.track_future(future);
        debug!(task = name, "spawning periodic maintenance task");
        tokio::spawn(tracked)
    }

    /// Cancel every tracked task and wait for them to finish, up to
    /// `timeout`. Returns whether every task exited before the deadline.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        info!(active = self.task_tracker.len(), "shutting down maintenance scheduler");
        self.cancel_token.cancel();
        self.task_tracker.close();
        tokio::select! {
            _ = self.task_tracker.wait() => {
                info!("all maintenance tasks exited cleanly");
                true
            }
            _ = tokio::time::sleep(timeout) => {
                warn!(remaining = self.task_tracker.len(), "maintenance shutdown timed out");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn periodic_task_ticks_until_shutdown() {
        let scheduler = MaintenanceScheduler::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        let counted = ticks.clone();
        scheduler.spawn_periodic("counter", Duration::from_millis(5), move |_token| {
            let counted = counted.clone();
            async move {
                counted.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(40)).await;
        let completed = scheduler.shutdown(Duration::from_secs(1)).await;

        assert!(completed);
        assert!(ticks.load(Ordering::SeqCst) >= 2);
    }
}

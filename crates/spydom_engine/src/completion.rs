use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use spydom_core::Target;
use tokio::sync::watch;

/// How a target left the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retirement {
    Completed,
    Abandoned,
}

/// Outstanding-target and live-worker counters that sequence shutdown.
///
/// Outstanding targets are counted once per dispatched target; retries never
/// add to the count, and each target retires exactly once.
pub struct CompletionTracker {
    outstanding: watch::Sender<usize>,
    live_workers: watch::Sender<usize>,
    completed: Mutex<Vec<Target>>,
    abandoned: AtomicUsize,
}

impl Default for CompletionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self {
            outstanding: watch::Sender::new(0),
            live_workers: watch::Sender::new(0),
            completed: Mutex::new(Vec::new()),
            abandoned: AtomicUsize::new(0),
        }
    }

    /// Count `n` more targets before they are dispatched.
    pub fn expect(&self, n: usize) {
        self.outstanding.send_modify(|count| *count += n);
    }

    pub fn retire(&self, target: &Target, how: Retirement) {
        match how {
            Retirement::Completed => self.completed_list().push(target.clone()),
            Retirement::Abandoned => {
                self.abandoned.fetch_add(1, Ordering::SeqCst);
            }
        }
        self.outstanding.send_modify(|count| {
            debug_assert!(*count > 0, "target retired twice");
            *count = count.saturating_sub(1);
        });
    }

    pub fn worker_started(&self) {
        self.live_workers.send_modify(|count| *count += 1);
    }

    pub fn worker_exited(&self) {
        self.live_workers
            .send_modify(|count| *count = count.saturating_sub(1));
    }

    pub fn outstanding(&self) -> usize {
        *self.outstanding.borrow()
    }

    pub fn live_workers(&self) -> usize {
        *self.live_workers.borrow()
    }

    pub fn completed(&self) -> usize {
        self.completed_list().len()
    }

    /// Targets that finished their task plan, in retirement order.
    pub fn completed_targets(&self) -> Vec<Target> {
        self.completed_list().clone()
    }

    fn completed_list(&self) -> std::sync::MutexGuard<'_, Vec<Target>> {
        self.completed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn abandoned(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }

    /// Resolves once every expected target has retired.
    pub async fn drained(&self) {
        wait_for_zero(&self.outstanding).await;
    }

    /// Resolves once every started worker has exited.
    pub async fn workers_exited(&self) {
        wait_for_zero(&self.live_workers).await;
    }
}

async fn wait_for_zero(counter: &watch::Sender<usize>) {
    let mut rx = counter.subscribe();
    // The sender lives in `self`, so the channel cannot close while we wait.
    let _ = rx.wait_for(|count| *count == 0).await;
}

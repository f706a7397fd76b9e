use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_trace};
use futures_util::FutureExt;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::completion::{CompletionTracker, Retirement};
use crate::persist::ensure_target_dir;
use crate::progress::ProgressSink;
use crate::registry::TaskPlan;
use crate::session::BrowserSession;
use crate::task::{TaskContext, TaskError};
use crate::{Diagnostic, Dispatch, EngineEvent, LoadError, LoadFailure, WorkerId};

/// Timing knobs shared by every worker.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub output_dir: PathBuf,
    pub load_timeout: Duration,
    pub settle: Duration,
    pub task_timeout: Option<Duration>,
}

/// Shared receiving end of the work channel.
pub type WorkQueue = Arc<Mutex<mpsc::Receiver<Dispatch>>>;

/// Channels and shared state a worker reports into.
#[derive(Clone)]
pub struct WorkerLinks {
    pub queue: WorkQueue,
    pub failures: mpsc::UnboundedSender<LoadFailure>,
    pub diagnostics: mpsc::Sender<Diagnostic>,
    pub tracker: Arc<CompletionTracker>,
    pub progress: Arc<dyn ProgressSink>,
    pub shutdown: CancellationToken,
}

/// Owns one browser session and processes targets strictly one at a time.
pub struct Worker {
    id: WorkerId,
    session: Box<dyn BrowserSession>,
    plan: Arc<TaskPlan>,
    settings: Arc<WorkerSettings>,
    links: WorkerLinks,
}

impl Worker {
    /// Creating a worker counts it as live.
    pub fn new(
        id: WorkerId,
        session: Box<dyn BrowserSession>,
        plan: Arc<TaskPlan>,
        settings: Arc<WorkerSettings>,
        links: WorkerLinks,
    ) -> Self {
        links.tracker.worker_started();
        Self {
            id,
            session,
            plan,
            settings,
            links,
        }
    }

    /// Navigate with a bounded deadline, then let the page settle.
    pub async fn load(&self, url: &str) -> Result<(), LoadError> {
        engine_debug!("Worker {}: loading {}", self.id, url);
        let deadline = self.settings.load_timeout;
        match tokio::time::timeout(deadline, self.session.navigate(url)).await {
            Err(_) => Err(LoadError::Timeout(deadline)),
            Ok(Err(err)) => Err(LoadError::Session(err)),
            Ok(Ok(())) => {
                tokio::time::sleep(self.settings.settle).await;
                Ok(())
            }
        }
    }

    /// Pull targets until the work channel closes or shutdown is requested.
    /// Hands the session back so the caller can tear it down.
    pub async fn run(self) -> Box<dyn BrowserSession> {
        while let Some(dispatch) = self.next().await {
            self.process(dispatch).await;
        }

        self.links.tracker.worker_exited();
        self.links
            .progress
            .emit(EngineEvent::WorkerExited { worker: self.id });
        self.session
    }

    async fn next(&self) -> Option<Dispatch> {
        if self.links.shutdown.is_cancelled() {
            return None;
        }
        let mut queue = self.links.queue.lock().await;
        tokio::select! {
            biased;
            _ = self.links.shutdown.cancelled() => None,
            dispatch = queue.recv() => dispatch,
        }
    }

    async fn process(&self, dispatch: Dispatch) {
        let Dispatch { target, attempt } = &dispatch;
        match self.load(target.as_str()).await {
            Ok(()) => {
                self.links.progress.emit(EngineEvent::TargetLoaded {
                    worker: self.id,
                    target: target.clone(),
                    attempt: *attempt,
                });
                self.run_tasks(&dispatch).await;
                self.links.progress.emit(EngineEvent::TargetCompleted {
                    worker: self.id,
                    target: target.clone(),
                });
                self.links.tracker.retire(target, Retirement::Completed);
            }
            Err(error) => {
                self.report(Diagnostic::LoadFailed {
                    worker: self.id,
                    target: target.clone(),
                    attempt: *attempt,
                    error: error.clone(),
                })
                .await;
                // The coordinator owns the target from here on.
                let _ = self.links.failures.send(LoadFailure {
                    worker: self.id,
                    dispatch,
                    error,
                });
            }
        }
    }

    /// Run every planned task, tier by tier. Failures are reported, never fatal.
    async fn run_tasks(&self, dispatch: &Dispatch) {
        let target = &dispatch.target;
        let relative = target.output_dir_name();
        let output_dir = match ensure_target_dir(&self.settings.output_dir, &relative) {
            Ok(dir) => dir,
            Err(error) => {
                self.report(Diagnostic::OutputDir {
                    target: target.clone(),
                    error,
                })
                .await;
                return;
            }
        };

        let ctx = TaskContext {
            session: self.session.as_ref(),
            target,
            output_dir: &output_dir,
            attempt: dispatch.attempt,
        };

        for (priority, tasks) in self.plan.by_priority() {
            engine_trace!("Worker {}: tier {} on {}", self.id, priority, target);
            for task in tasks {
                // Panics stay contained to the task that raised them.
                let run = AssertUnwindSafe(task.run(&ctx)).catch_unwind();
                let result = match self.settings.task_timeout {
                    Some(limit) => tokio::time::timeout(limit, run)
                        .await
                        .unwrap_or(Ok(Err(TaskError::Timeout(limit)))),
                    None => run.await,
                }
                .unwrap_or_else(|panic| Err(TaskError::Panicked(panic_message(panic.as_ref()))));
                let succeeded = result.is_ok();
                if let Err(error) = result {
                    self.report(Diagnostic::TaskFailed {
                        worker: self.id,
                        target: target.clone(),
                        slug: task.slug().to_string(),
                        attempt: dispatch.attempt,
                        error,
                    })
                    .await;
                }
                self.links.progress.emit(EngineEvent::TaskFinished {
                    worker: self.id,
                    target: target.clone(),
                    slug: task.slug().to_string(),
                    succeeded,
                });
            }
        }
    }

    async fn report(&self, diagnostic: Diagnostic) {
        // Only fails once the sink is gone, which happens after every worker exits.
        let _ = self.links.diagnostics.send(diagnostic).await;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

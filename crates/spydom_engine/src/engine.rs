use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use spydom_core::{RunConfig, Target};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::completion::CompletionTracker;
use crate::persist::{ensure_output_dir, PersistError};
use crate::progress::{LogProgressSink, ProgressSink};
use crate::registry::TaskPlan;
use crate::retry::RetryCoordinator;
use crate::session::{BrowserSession, SessionAllocator, SessionError};
use crate::sink::ErrorSink;
use crate::worker::{Worker, WorkerLinks, WorkerSettings};
use crate::{Dispatch, RunSummary};

/// Capacity of the work channel. One slot keeps the source and the retry
/// coordinator in lock-step with free workers.
const WORK_CAPACITY: usize = 1;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    OutputDir(#[from] PersistError),
    #[error("failed to open browser session {index}: {source}")]
    Session {
        index: usize,
        #[source]
        source: SessionError,
    },
    #[error("engine task panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub workers: usize,
    pub output_dir: PathBuf,
    pub load_timeout: Duration,
    pub settle: Duration,
    /// Maximum load attempts per target.
    pub retries: u32,
    pub task_timeout: Option<Duration>,
}

impl EngineSettings {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            workers: config.threads,
            output_dir: config.output_dir.clone(),
            load_timeout: config.timeout,
            settle: config.wait,
            retries: config.retries,
            task_timeout: config.task_timeout,
        }
    }
}

/// Wires the worker pool, URL source, retry coordinator and error sink together.
pub struct Engine {
    settings: EngineSettings,
    plan: Arc<TaskPlan>,
    allocator: Arc<dyn SessionAllocator>,
    progress: Arc<dyn ProgressSink>,
}

impl Engine {
    pub fn new(
        settings: EngineSettings,
        plan: TaskPlan,
        allocator: Arc<dyn SessionAllocator>,
    ) -> Self {
        Self {
            settings,
            plan: Arc::new(plan),
            allocator,
            progress: Arc::new(LogProgressSink),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Load and analyse every target. Returns once all of them retired, or
    /// early (with `interrupted` set) when `shutdown` fires.
    pub async fn run(
        &self,
        targets: Vec<Target>,
        shutdown: CancellationToken,
    ) -> Result<RunSummary, EngineError> {
        ensure_output_dir(&self.settings.output_dir)?;
        let sessions = self.open_sessions().await?;

        let (work_tx, work_rx) = mpsc::channel::<Dispatch>(WORK_CAPACITY);
        let (failure_tx, failure_rx) = mpsc::unbounded_channel();
        let (diagnostics_tx, error_sink) = ErrorSink::channel();
        let tracker = Arc::new(CompletionTracker::new());
        let dispatched = targets.len();
        tracker.expect(dispatched);

        let sink_handle = tokio::spawn(error_sink.run());

        let links = WorkerLinks {
            queue: Arc::new(Mutex::new(work_rx)),
            failures: failure_tx,
            diagnostics: diagnostics_tx.clone(),
            tracker: tracker.clone(),
            progress: self.progress.clone(),
            shutdown: shutdown.clone(),
        };
        let worker_settings = Arc::new(WorkerSettings {
            output_dir: self.settings.output_dir.clone(),
            load_timeout: self.settings.load_timeout,
            settle: self.settings.settle,
            task_timeout: self.settings.task_timeout,
        });
        let worker_handles: Vec<JoinHandle<Box<dyn BrowserSession>>> = sessions
            .into_iter()
            .enumerate()
            .map(|(id, session)| {
                let worker = Worker::new(
                    id,
                    session,
                    self.plan.clone(),
                    worker_settings.clone(),
                    links.clone(),
                );
                tokio::spawn(worker.run())
            })
            .collect();
        drop(links);

        let coordinator_stop = shutdown.child_token();
        let coordinator = RetryCoordinator::new(
            self.settings.retries,
            failure_rx,
            work_tx.clone(),
            diagnostics_tx,
            tracker.clone(),
            self.progress.clone(),
        );
        let coordinator_handle = tokio::spawn(coordinator.run(coordinator_stop.clone()));

        let source_handle = tokio::spawn(feed(targets, work_tx, shutdown.clone()));

        let interrupted = tokio::select! {
            _ = tracker.drained() => false,
            _ = shutdown.cancelled() => true,
        };
        if interrupted {
            engine_warn!(
                "Interrupted with {} targets outstanding; waiting for workers to finish their current target",
                tracker.outstanding()
            );
        } else {
            engine_debug!("All {} targets retired", dispatched);
        }

        // Releasing the coordinator's sender (the source has already dropped its
        // own) closes the work channel, which lets idle workers exit.
        coordinator_stop.cancel();
        let abandoned_targets = coordinator_handle.await?;
        source_handle.await?;

        let mut sessions = Vec::with_capacity(worker_handles.len());
        for handle in worker_handles {
            sessions.push(handle.await?);
        }
        tracker.workers_exited().await;

        let tally = sink_handle.await?;
        self.teardown(sessions).await;

        let summary = RunSummary {
            dispatched,
            completed: tracker.completed(),
            abandoned: tracker.abandoned(),
            load_failures: tally.load_failures,
            task_failures: tally.task_failures,
            completed_targets: tracker.completed_targets(),
            abandoned_targets,
            interrupted,
        };
        engine_info!(
            "Run finished: {} completed, {} abandoned, {} task failures",
            summary.completed,
            summary.abandoned,
            summary.task_failures
        );
        Ok(summary)
    }

    /// One session per worker, all acquired before any target is fed in.
    async fn open_sessions(&self) -> Result<Vec<Box<dyn BrowserSession>>, EngineError> {
        let mut sessions = Vec::with_capacity(self.settings.workers);
        for index in 0..self.settings.workers {
            match self.allocator.new_session().await {
                Ok(session) => sessions.push(session),
                Err(source) => {
                    self.teardown(sessions).await;
                    return Err(EngineError::Session { index, source });
                }
            }
        }
        Ok(sessions)
    }

    /// Close sessions in reverse acquisition order, then the allocator.
    async fn teardown(&self, sessions: Vec<Box<dyn BrowserSession>>) {
        for (index, session) in sessions.into_iter().enumerate().rev() {
            if let Err(err) = session.close().await {
                engine_warn!("Failed to close browser session {}: {}", index, err);
            }
        }
        if let Err(err) = self.allocator.shutdown().await {
            engine_warn!("Failed to shut down session allocator: {}", err);
        }
    }
}

/// URL source: push every target onto the work channel, then drop the sender.
async fn feed(
    targets: Vec<Target>,
    work_tx: mpsc::Sender<Dispatch>,
    shutdown: CancellationToken,
) {
    for target in targets {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return,
            sent = work_tx.send(Dispatch::first(target)) => {
                if sent.is_err() {
                    return;
                }
            }
        }
    }
}

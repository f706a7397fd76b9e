use std::fmt;
use std::time::Duration;

use spydom_core::Target;

use crate::session::SessionError;
use crate::task::TaskError;

pub type WorkerId = usize;

/// A target handed to a worker, with the 1-based attempt it represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub target: Target,
    pub attempt: u32,
}

impl Dispatch {
    pub fn first(target: Target) -> Self {
        Self { target, attempt: 1 }
    }
}

/// Why a page could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Failure notification from a worker to the retry coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub worker: WorkerId,
    pub dispatch: Dispatch,
    pub error: LoadError,
}

/// Lifecycle events for progress reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    TargetLoaded {
        worker: WorkerId,
        target: Target,
        attempt: u32,
    },
    TaskFinished {
        worker: WorkerId,
        target: Target,
        slug: String,
        succeeded: bool,
    },
    TargetCompleted {
        worker: WorkerId,
        target: Target,
    },
    TargetAbandoned {
        target: Target,
        attempts: u32,
    },
    WorkerExited {
        worker: WorkerId,
    },
}

/// Non-fatal problems, drained by the error sink.
#[derive(Debug)]
pub enum Diagnostic {
    LoadFailed {
        worker: WorkerId,
        target: Target,
        attempt: u32,
        error: LoadError,
    },
    Retrying {
        target: Target,
        attempt: u32,
        budget: u32,
    },
    GaveUp {
        target: Target,
        attempts: u32,
    },
    TaskFailed {
        worker: WorkerId,
        target: Target,
        slug: String,
        attempt: u32,
        error: TaskError,
    },
    OutputDir {
        target: Target,
        error: std::io::Error,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::LoadFailed {
                worker,
                target,
                attempt,
                error,
            } => write!(
                f,
                "worker {worker}: failed to load {target} (attempt {attempt}): {error}"
            ),
            Diagnostic::Retrying {
                target,
                attempt,
                budget,
            } => write!(f, "retrying {target} (attempt {attempt}/{budget})"),
            Diagnostic::GaveUp { target, attempts } => {
                write!(f, "giving up on {target} after {attempts} attempts")
            }
            Diagnostic::TaskFailed {
                worker,
                target,
                slug,
                attempt,
                error,
            } => write!(
                f,
                "worker {worker}: task {slug} failed on {target} (attempt {attempt}): {error}"
            ),
            Diagnostic::OutputDir { target, error } => {
                write!(f, "cannot create output directory for {target}: {error}")
            }
        }
    }
}

/// Totals for a finished (or interrupted) run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub dispatched: usize,
    pub completed: usize,
    pub abandoned: usize,
    pub load_failures: usize,
    pub task_failures: usize,
    pub completed_targets: Vec<Target>,
    pub abandoned_targets: Vec<Target>,
    pub interrupted: bool,
}

impl RunSummary {
    /// Every dispatched target reached a terminal state.
    pub fn is_settled(&self) -> bool {
        self.completed + self.abandoned == self.dispatched
    }
}

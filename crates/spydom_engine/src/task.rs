use std::io;
use std::path::Path;
use std::time::Duration;

use spydom_core::{Priority, Target, TaskConfig};
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};
use crate::session::{BrowserSession, SessionError};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("unexpected result: {0}")]
    UnexpectedResult(String),
    #[error("task panicked: {0}")]
    Panicked(String),
}

/// Everything a task sees while it runs against one loaded page.
pub struct TaskContext<'a> {
    pub session: &'a dyn BrowserSession,
    pub target: &'a Target,
    pub output_dir: &'a Path,
    pub attempt: u32,
}

impl TaskContext<'_> {
    /// Writer for artifacts under this target's output directory.
    pub fn writer(&self) -> AtomicFileWriter {
        AtomicFileWriter::new(self.output_dir.to_path_buf())
    }

    /// Writer for artifacts under a subdirectory of this target's output directory.
    pub fn writer_in(&self, relative: impl AsRef<Path>) -> AtomicFileWriter {
        AtomicFileWriter::new(self.output_dir.join(relative))
    }
}

/// A pluggable analysis routine executed against a loaded page.
#[async_trait::async_trait]
pub trait Task: Send + Sync {
    /// Command-line friendly identifier used for enable/disable filtering.
    fn slug(&self) -> &str;

    /// Human readable name used in reports.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn priority(&self) -> Priority;

    /// The tier this task would run at under `config`, without initialising it.
    fn configured_priority(&self, _config: &TaskConfig) -> Priority {
        self.priority()
    }

    /// Whether the external configuration this task depends on is present.
    fn is_configured(&self, _config: &TaskConfig) -> bool {
        true
    }

    /// Called once at startup on every task that survived filtering.
    fn init(&mut self, _config: &TaskConfig) -> Result<(), TaskError> {
        Ok(())
    }

    async fn run(&self, ctx: &TaskContext<'_>) -> Result<(), TaskError>;
}

/// Description of a registered task as it would run under a given config, for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDescriptor {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub priority: Priority,
}

impl TaskDescriptor {
    pub fn of(task: &dyn Task, config: &TaskConfig) -> Self {
        Self {
            slug: task.slug().to_string(),
            name: task.name().to_string(),
            description: task.description().to_string(),
            priority: task.configured_priority(config),
        }
    }
}

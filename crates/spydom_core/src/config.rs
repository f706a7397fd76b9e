use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::{Priority, PriorityError, TaskFilter};

pub const DEFAULT_OUTPUT_DIR: &str = "spydom_output";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("thread count must be at least 1")]
    NoThreads,
    #[error("retries must be at least 1 (it is the maximum number of load attempts)")]
    NoRetries,
    #[error("load timeout must be greater than zero")]
    ZeroTimeout,
    #[error("--js and --js-file are mutually exclusive")]
    ConflictingScripts,
    #[error("invalid js priority: {0}")]
    JsPriority(#[from] PriorityError),
}

/// Every setting of a run, independent of how it was supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub threads: usize,
    pub wait: Duration,
    pub output_dir: PathBuf,
    /// Maximum number of load attempts per target.
    pub retries: u32,
    pub timeout: Duration,
    /// Per-task deadline; `None` lets tasks run unbounded.
    pub task_timeout: Option<Duration>,
    pub enabled: Vec<String>,
    pub disabled: Vec<String>,
    pub js: Option<String>,
    pub js_file: Option<PathBuf>,
    pub js_priority: u8,
    pub insecure: bool,
    pub visible: bool,
    pub verbose: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            threads: 10,
            wait: Duration::from_secs(2),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            retries: 3,
            timeout: Duration::from_secs(10),
            task_timeout: Some(Duration::from_secs(60)),
            enabled: Vec::new(),
            disabled: Vec::new(),
            js: None,
            js_file: None,
            js_priority: Priority::MAX.value(),
            insecure: false,
            visible: false,
            verbose: false,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::NoThreads);
        }
        if self.retries == 0 {
            return Err(ConfigError::NoRetries);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.js.is_some() && self.js_file.is_some() {
            return Err(ConfigError::ConflictingScripts);
        }
        Priority::new(self.js_priority)?;
        Ok(())
    }

    /// The user's enable/disable selection, before any auto-disabling.
    pub fn task_filter(&self) -> TaskFilter {
        TaskFilter::new(self.enabled.iter().cloned(), self.disabled.iter().cloned())
    }

    /// The subset of settings visible to tasks during `init`.
    pub fn task_config(&self) -> TaskConfig {
        TaskConfig {
            js: self.js.clone(),
            js_file: self.js_file.clone(),
            js_priority: self.js_priority,
        }
    }
}

/// Settings handed to each task's `init`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskConfig {
    pub js: Option<String>,
    pub js_file: Option<PathBuf>,
    pub js_priority: u8,
}

impl TaskConfig {
    pub fn has_script(&self) -> bool {
        self.js.as_deref().is_some_and(|s| !s.is_empty()) || self.js_file.is_some()
    }
}

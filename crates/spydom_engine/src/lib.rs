//! Spydom engine: worker pool, retry coordination, task execution and reporting.
mod completion;
mod engine;
mod persist;
mod progress;
mod registry;
mod report;
mod retry;
mod session;
mod sink;
mod task;
pub mod tasks;
mod types;
mod worker;

#[cfg(feature = "chrome")]
pub mod chrome;

pub use completion::{CompletionTracker, Retirement};
pub use engine::{Engine, EngineError, EngineSettings};
pub use persist::{ensure_output_dir, ensure_target_dir, AtomicFileWriter, PersistError};
pub use progress::{LogProgressSink, ProgressSink};
pub use registry::{RegistryError, TaskPlan, TaskRegistry};
pub use report::{write_report, ReportError, REPORT_FILENAME};
pub use retry::RetryCoordinator;
pub use session::{BrowserSession, EvalMode, SessionAllocator, SessionError};
pub use sink::{DiagnosticTally, ErrorSink, DIAGNOSTIC_CAPACITY};
pub use task::{Task, TaskContext, TaskDescriptor, TaskError};
pub use types::{
    Diagnostic, Dispatch, EngineEvent, LoadError, LoadFailure, RunSummary, WorkerId,
};
pub use worker::{WorkQueue, Worker, WorkerLinks, WorkerSettings};

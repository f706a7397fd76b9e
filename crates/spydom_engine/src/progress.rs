use engine_logging::{engine_debug, engine_info};

use crate::EngineEvent;

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Logs lifecycle events through the `engine_*` macros.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: EngineEvent) {
        match event {
            EngineEvent::TargetLoaded {
                worker,
                target,
                attempt,
            } => engine_debug!("Worker {}: loaded {} (attempt {})", worker, target, attempt),
            EngineEvent::TaskFinished {
                worker,
                target,
                slug,
                succeeded,
            } => engine_debug!(
                "Worker {}: task {} on {} {}",
                worker,
                slug,
                target,
                if succeeded { "done" } else { "failed" }
            ),
            EngineEvent::TargetCompleted { worker, target } => {
                engine_info!("Worker {}: finished {}", worker, target)
            }
            EngineEvent::TargetAbandoned { target, attempts } => {
                engine_info!("Abandoned {} after {} attempts", target, attempts)
            }
            EngineEvent::WorkerExited { worker } => engine_debug!("Worker {}: exited", worker),
        }
    }
}

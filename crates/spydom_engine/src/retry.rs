use std::collections::HashMap;
use std::sync::Arc;

use spydom_core::Target;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::completion::{CompletionTracker, Retirement};
use crate::progress::ProgressSink;
use crate::{Diagnostic, Dispatch, EngineEvent, LoadFailure};

/// Owns every retry record. Nothing else reads or writes the attempt map.
pub struct RetryCoordinator {
    budget: u32,
    attempts: HashMap<Target, u32>,
    failures: mpsc::UnboundedReceiver<LoadFailure>,
    work_tx: mpsc::Sender<Dispatch>,
    diagnostics: mpsc::Sender<Diagnostic>,
    tracker: Arc<CompletionTracker>,
    progress: Arc<dyn ProgressSink>,
    abandoned: Vec<Target>,
}

impl RetryCoordinator {
    /// `budget` is the maximum number of load attempts per target.
    pub fn new(
        budget: u32,
        failures: mpsc::UnboundedReceiver<LoadFailure>,
        work_tx: mpsc::Sender<Dispatch>,
        diagnostics: mpsc::Sender<Diagnostic>,
        tracker: Arc<CompletionTracker>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            budget: budget.max(1),
            attempts: HashMap::new(),
            failures,
            work_tx,
            diagnostics,
            tracker,
            progress,
            abandoned: Vec::new(),
        }
    }

    /// Process failures until `stop` fires or every worker has gone.
    /// Returns the targets that were given up on.
    pub async fn run(mut self, stop: CancellationToken) -> Vec<Target> {
        loop {
            let failure = tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                failure = self.failures.recv() => match failure {
                    Some(failure) => failure,
                    None => break,
                },
            };
            if !self.handle(failure, &stop).await {
                break;
            }
        }
        self.abandoned
    }

    /// Returns false when the coordinator should stop.
    async fn handle(&mut self, failure: LoadFailure, stop: &CancellationToken) -> bool {
        let target = failure.dispatch.target;
        let count = self.attempts.entry(target.clone()).or_insert(0);
        *count += 1;
        let attempts = *count;

        if attempts >= self.budget {
            self.attempts.remove(&target);
            let _ = self
                .diagnostics
                .send(Diagnostic::GaveUp {
                    target: target.clone(),
                    attempts,
                })
                .await;
            self.progress.emit(EngineEvent::TargetAbandoned {
                target: target.clone(),
                attempts,
            });
            self.tracker.retire(&target, Retirement::Abandoned);
            self.abandoned.push(target);
            return true;
        }

        let next = attempts + 1;
        let _ = self
            .diagnostics
            .send(Diagnostic::Retrying {
                target: target.clone(),
                attempt: next,
                budget: self.budget,
            })
            .await;

        let dispatch = Dispatch {
            target,
            attempt: next,
        };
        tokio::select! {
            biased;
            _ = stop.cancelled() => false,
            sent = self.work_tx.send(dispatch) => sent.is_ok(),
        }
    }
}

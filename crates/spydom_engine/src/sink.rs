use engine_logging::{engine_error, engine_info, engine_warn};
use tokio::sync::mpsc;

use crate::Diagnostic;

/// Capacity of the diagnostics channel. Producers wait when it is full, so the
/// sink must keep draining for the whole run.
pub const DIAGNOSTIC_CAPACITY: usize = 16;

/// Counts of what the sink has seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticTally {
    pub load_failures: usize,
    pub retries: usize,
    pub give_ups: usize,
    pub task_failures: usize,
    pub output_dir_failures: usize,
}

/// Single consumer of the diagnostics channel.
///
/// Runs until every sender has been dropped, then returns its tally.
pub struct ErrorSink {
    rx: mpsc::Receiver<Diagnostic>,
    tally: DiagnosticTally,
}

impl ErrorSink {
    pub fn channel() -> (mpsc::Sender<Diagnostic>, Self) {
        let (tx, rx) = mpsc::channel(DIAGNOSTIC_CAPACITY);
        (
            tx,
            Self {
                rx,
                tally: DiagnosticTally::default(),
            },
        )
    }

    pub async fn run(mut self) -> DiagnosticTally {
        while let Some(diagnostic) = self.rx.recv().await {
            self.record(&diagnostic);
        }
        self.tally
    }

    fn record(&mut self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::LoadFailed { .. } => {
                self.tally.load_failures += 1;
                engine_warn!("{}", diagnostic);
            }
            Diagnostic::Retrying { .. } => {
                self.tally.retries += 1;
                engine_info!("{}", diagnostic);
            }
            Diagnostic::GaveUp { .. } => {
                self.tally.give_ups += 1;
                engine_error!("{}", diagnostic);
            }
            Diagnostic::TaskFailed { .. } => {
                self.tally.task_failures += 1;
                engine_error!("{}", diagnostic);
            }
            Diagnostic::OutputDir { .. } => {
                self.tally.output_dir_failures += 1;
                engine_error!("{}", diagnostic);
            }
        }
    }
}

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use log::{debug, info};
use serde::Serialize;

use super::state::RunState;

/// Aggregate counters of one pipeline run.
///
/// After a run, `processed == succeeded + failed == total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub total: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl PipelineStats {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.processed as f64 * 100.0 / self.total as f64
        }
    }
}

impl std::fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} ({:.1}%) - ok: {}, failed: {}",
            self.processed,
            self.total,
            self.percent(),
            self.succeeded,
            self.failed
        )
    }
}

/// Receives periodic snapshots while a run is in flight.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, snapshot: &PipelineStats);
}

/// Logs each snapshot at `info`.
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, snapshot: &PipelineStats) {
        info!("Progress: {}", snapshot);
    }
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _snapshot: &PipelineStats) {}
}

/// Background thread sampling [`RunState`] on a fixed interval.
///
/// It only takes snapshots and stops on its own once every file has been
/// processed, or when [`ProgressSampler::stop`] is called.
pub struct ProgressSampler {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl ProgressSampler {
    pub fn spawn(
        state: Arc<RunState>,
        interval: Duration,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        let (stop, stop_rx) = bounded::<()>(1);

        let handle = thread::spawn(move || loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    let snapshot = state.snapshot();
                    if snapshot.is_complete() {
                        break;
                    }
                    reporter.report(&snapshot);
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });

        Self { stop, handle }
    }

    pub fn stop(self) {
        let _ = self.stop.try_send(());
        drop(self.stop);
        if self.handle.join().is_err() {
            debug!("Progress sampler panicked");
        }
    }
}

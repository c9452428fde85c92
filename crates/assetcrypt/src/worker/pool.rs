use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, error, info};

use crate::error::{FileError, WorkerError};
use crate::worker::job::{FileOutcome, FileTask};

/// Work done by each pool worker for a single file.
pub trait FileProcessor: Send + Sync {
    fn process(&self, task: &FileTask) -> FileOutcome;
}

/// Fixed-size pool of threads pulling [`FileTask`]s from a bounded queue.
///
/// Every submitted task yields exactly one [`FileOutcome`], including when
/// the processor panics.
pub struct WorkerPool {
    job_sender: Sender<FileTask>,
    result_receiver: Receiver<FileOutcome>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// # Panics
    /// Panics if `worker_count` is 0.
    pub fn new(processor: Arc<dyn FileProcessor>, worker_count: usize) -> Self {
        assert!(worker_count > 0, "worker_count must be > 0");
        let (job_sender, job_receiver) = bounded::<FileTask>(worker_count * 2);
        let (result_sender, result_receiver) = bounded::<FileOutcome>(worker_count * 2);

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let job_rx = job_receiver.clone();
            let result_tx = result_sender.clone();
            let worker_processor = Arc::clone(&processor);

            let handle = thread::spawn(move || {
                run_worker(worker_id, job_rx, result_tx, worker_processor);
            });

            workers.push(handle);
        }

        info!("Started {} workers", worker_count);

        Self {
            job_sender,
            result_receiver,
            workers,
        }
    }

    pub fn submit(&self, task: FileTask) -> Result<(), WorkerError> {
        self.job_sender
            .send(task)
            .map_err(|_| WorkerError::ChannelClosed)
    }

    /// Blocks for the next outcome. `None` once every worker has exited.
    pub fn recv_result(&self) -> Option<FileOutcome> {
        self.result_receiver.recv().ok()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Submits all `tasks` from a feeder thread while collecting their
    /// outcomes on the calling thread, then shuts the pool down.
    pub fn run_all(self, tasks: Vec<FileTask>) -> Vec<FileOutcome> {
        let total = tasks.len();
        let mut outcomes = Vec::with_capacity(total);

        thread::scope(|scope| {
            scope.spawn(|| {
                for task in tasks {
                    if let Err(e) = self.submit(task) {
                        error!("Failed to submit task: {}", e);
                        break;
                    }
                }
            });

            while outcomes.len() < total {
                match self.recv_result() {
                    Some(outcome) => outcomes.push(outcome),
                    None => break,
                }
            }
        });

        self.wait();
        outcomes
    }

    pub fn wait(self) {
        // Drop sender to signal workers to exit
        drop(self.job_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        debug!("All workers have stopped");
    }
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn run_worker(
    worker_id: usize,
    job_receiver: Receiver<FileTask>,
    result_sender: Sender<FileOutcome>,
    processor: Arc<dyn FileProcessor>,
) {
    debug!("Worker {} started", worker_id);

    for task in job_receiver.iter() {
        debug!("Worker {} processing: {}", worker_id, task.relative_path.display());

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| processor.process(&task)))
            .unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                error!("Worker {} panicked on {}: {}", worker_id, task.relative_path.display(), message);
                FileOutcome::failure(&task, FileError::Panicked { message })
            });

        if let Err(e) = result_sender.send(outcome) {
            error!("Worker {} failed to send result: {}", worker_id, e);
            break;
        }
    }

    debug!("Worker {} stopped", worker_id);
}

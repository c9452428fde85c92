use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, info_span, warn};

use crate::catalog::{KeyIndex, KeyLookup};
use crate::cipher::BlockCipher;
use crate::error::{FileError, WorkerError};
use crate::worker::pool::panic_message;
use crate::worker::{DirectoryScanner, FileOutcome, FileProcessor, FileTask, WorkerPool};

use super::config::PipelineConfig;
use super::progress::{LogProgress, PipelineStats, ProgressReporter, ProgressSampler};
use super::state::RunState;

/// Successful files logged individually at `info` before dropping to `debug`.
const VERBOSE_SUCCESSES: usize = 5;

/// Decrypts every file of an input tree into a mirrored output tree.
pub struct DecryptionPipeline {
    config: PipelineConfig,
    cipher: Arc<dyn BlockCipher>,
    reporter: Arc<dyn ProgressReporter>,
}

impl DecryptionPipeline {
    pub fn new(config: PipelineConfig, cipher: Arc<dyn BlockCipher>) -> Self {
        Self {
            config,
            cipher,
            reporter: Arc::new(LogProgress),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the whole batch. Per-file failures are counted, never returned;
    /// only a failure to enumerate the input tree is an error.
    pub fn run(&self, keys: Arc<KeyIndex>) -> Result<PipelineStats, WorkerError> {
        let _span = info_span!(
            "decrypt_tree",
            input = %self.config.input_directory.display(),
            output = %self.config.output_directory.display(),
        )
        .entered();

        let tasks = DirectoryScanner::new(&self.config.input_directory).scan()?;
        let total = tasks.len();
        let state = Arc::new(RunState::new(total));

        if total == 0 {
            warn!("No files found to decrypt");
            return Ok(state.snapshot());
        }

        let workers = self.config.concurrency.clamp(1, total);
        info!(
            "Decrypting {} files with {} workers ({} keys)",
            total,
            workers,
            keys.len()
        );

        let processor = Arc::new(DecryptProcessor {
            output_directory: self.config.output_directory.clone(),
            keys,
            cipher: Arc::clone(&self.cipher),
            state: Arc::clone(&state),
        });

        let sampler = ProgressSampler::spawn(
            Arc::clone(&state),
            self.config.progress_interval,
            Arc::clone(&self.reporter),
        );
        let outcomes = WorkerPool::new(processor, workers).run_all(tasks);
        sampler.stop();

        let stats = state.snapshot();
        for outcome in outcomes.iter().filter(|o| !o.is_success()) {
            if let Some(ref e) = outcome.error {
                debug!("Failed: {} ({})", outcome.relative_path.display(), e);
            }
        }

        if stats.has_failures() {
            warn!("Decryption finished with failures: {}", stats);
        } else {
            info!("Decryption finished: {}", stats);
        }
        Ok(stats)
    }
}

struct DecryptProcessor {
    output_directory: PathBuf,
    keys: Arc<KeyIndex>,
    cipher: Arc<dyn BlockCipher>,
    state: Arc<RunState>,
}

impl DecryptProcessor {
    fn decrypt(&self, task: &FileTask) -> Result<PathBuf, FileError> {
        let key = match self.keys.lookup(&task.identifier) {
            KeyLookup::Found(key) => key,
            KeyLookup::NotFound => {
                return Err(FileError::NoKey {
                    identifier: task.identifier.clone(),
                })
            }
        };

        let output = self.output_directory.join(&task.relative_path);
        if let Some(parent) = output.parent() {
            self.state
                .ensure_directory(parent)
                .map_err(|source| FileError::CreateDirectory {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        self.cipher.decrypt_file(&task.input_path, &output, key)?;
        Ok(output)
    }
}

// A panicking cipher is counted here; the pool's own guard never sees it.
impl FileProcessor for DecryptProcessor {
    fn process(&self, task: &FileTask) -> FileOutcome {
        let _span = info_span!("decrypt_file", file = %task.relative_path.display()).entered();

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.decrypt(task)))
            .unwrap_or_else(|payload| {
                Err(FileError::Panicked {
                    message: panic_message(payload.as_ref()),
                })
            });

        match result {
            Ok(output) => {
                let stats = self.state.record(true);
                if stats.succeeded <= VERBOSE_SUCCESSES {
                    info!("Decrypted: {}", task.relative_path.display());
                } else {
                    debug!("Decrypted: {}", task.relative_path.display());
                }
                FileOutcome::success(task, output)
            }
            Err(e) => {
                self.state.record(false);
                warn!("Failed to decrypt {}: {}", task.relative_path.display(), e);
                FileOutcome::failure(task, e)
            }
        }
    }
}

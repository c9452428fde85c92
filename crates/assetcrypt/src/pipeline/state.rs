use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::progress::PipelineStats;

struct Inner {
    stats: PipelineStats,
    directories: HashSet<PathBuf>,
}

/// The mutable state shared by pipeline workers: the counters and the set of
/// output directories already created. Both sit behind one lock.
pub struct RunState {
    inner: Mutex<Inner>,
}

impl RunState {
    pub fn new(total: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                stats: PipelineStats::new(total),
                directories: HashSet::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Counts one processed file and returns the updated counters.
    pub fn record(&self, success: bool) -> PipelineStats {
        let mut inner = self.lock();
        inner.stats.processed += 1;
        if success {
            inner.stats.succeeded += 1;
        } else {
            inner.stats.failed += 1;
        }
        inner.stats
    }

    pub fn snapshot(&self) -> PipelineStats {
        self.lock().stats
    }

    /// Creates `dir` and its parents once per run.
    pub fn ensure_directory(&self, dir: &Path) -> std::io::Result<()> {
        let mut inner = self.lock();
        if inner.directories.contains(dir) {
            return Ok(());
        }
        std::fs::create_dir_all(dir)?;
        inner.directories.insert(dir.to_path_buf());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_concurrent_records_are_not_lost() {
        let state = Arc::new(RunState::new(800));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let state = Arc::clone(&state);
                thread::spawn(move || {
                    for i in 0..100 {
                        state.record((i + t) % 4 != 0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = state.snapshot();
        assert_eq!(stats.processed, 800);
        assert_eq!(stats.succeeded + stats.failed, 800);
        assert_eq!(stats.failed, 200);
    }

    #[test]
    fn test_concurrent_directory_creation() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("x").join("y");
        let state = Arc::new(RunState::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = Arc::clone(&state);
                let target = target.clone();
                thread::spawn(move || state.ensure_directory(&target))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert!(target.is_dir());
    }
}

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::WorkerError;
use crate::worker::job::FileTask;

/// Recursively discovers every regular file under a root.
pub struct DirectoryScanner {
    input_directory: PathBuf,
}

impl DirectoryScanner {
    pub fn new<P: AsRef<Path>>(input_directory: P) -> Self {
        Self {
            input_directory: input_directory.as_ref().to_path_buf(),
        }
    }

    pub fn input_directory(&self) -> &Path {
        &self.input_directory
    }

    /// Returns one task per file, sorted by relative path. Unreadable
    /// entries below the root are skipped with a warning; an unreadable
    /// root is an error.
    pub fn scan(&self) -> Result<Vec<FileTask>, WorkerError> {
        let mut tasks = Vec::new();

        for entry in WalkDir::new(&self.input_directory).min_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(WorkerError::ScanFailed {
                        path: self.input_directory.clone(),
                        source: e,
                    });
                }
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            debug!("Found file: {}", entry.path().display());
            tasks.push(FileTask::new(&self.input_directory, entry.into_path()));
        }

        tasks.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        info!(
            "Scanned {} files in {}",
            tasks.len(),
            self.input_directory.display()
        );
        Ok(tasks)
    }
}

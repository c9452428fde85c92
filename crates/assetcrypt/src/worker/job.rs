use std::path::{Path, PathBuf};

use crate::error::FileError;

/// One discovered file, waiting for a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    pub input_path: PathBuf,
    /// Path relative to the scanned root; mirrored under the output root.
    pub relative_path: PathBuf,
    /// Key lookup identifier: the file's base name.
    pub identifier: String,
}

impl FileTask {
    /// Builds a task for `input_path`, which must lie under `root`.
    pub fn new(root: &Path, input_path: PathBuf) -> Self {
        let relative_path = input_path
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| {
                input_path
                    .file_name()
                    .map(PathBuf::from)
                    .unwrap_or_default()
            });
        let identifier = input_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            input_path,
            relative_path,
            identifier,
        }
    }
}

#[derive(Debug)]
pub struct FileOutcome {
    pub relative_path: PathBuf,
    pub identifier: String,
    pub output_path: Option<PathBuf>,
    pub error: Option<FileError>,
}

impl FileOutcome {
    pub fn success(task: &FileTask, output_path: PathBuf) -> Self {
        Self {
            relative_path: task.relative_path.clone(),
            identifier: task.identifier.clone(),
            output_path: Some(output_path),
            error: None,
        }
    }

    pub fn failure(task: &FileTask, error: FileError) -> Self {
        Self {
            relative_path: task.relative_path.clone(),
            identifier: task.identifier.clone(),
            output_path: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_paths() {
        let task = FileTask::new(Path::new("/in"), PathBuf::from("/in/sub/dir/AB12"));
        assert_eq!(task.relative_path, PathBuf::from("sub/dir/AB12"));
        assert_eq!(task.identifier, "AB12");
    }

    #[test]
    fn test_task_outside_root_uses_file_name() {
        let task = FileTask::new(Path::new("/in"), PathBuf::from("/elsewhere/x.bin"));
        assert_eq!(task.relative_path, PathBuf::from("x.bin"));
    }

    #[test]
    fn test_outcomes() {
        let task = FileTask::new(Path::new("/in"), PathBuf::from("/in/a.bin"));

        let ok = FileOutcome::success(&task, PathBuf::from("/out/a.bin"));
        assert!(ok.is_success());
        assert_eq!(ok.output_path, Some(PathBuf::from("/out/a.bin")));

        let failed = FileOutcome::failure(
            &task,
            FileError::NoKey {
                identifier: "a.bin".to_string(),
            },
        );
        assert!(!failed.is_success());
        assert!(failed.output_path.is_none());
        assert!(failed.error.unwrap().to_string().contains("a.bin"));
    }
}

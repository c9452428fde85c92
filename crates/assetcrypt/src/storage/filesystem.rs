//! Plain tree copy for content that needs no decryption.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::StorageError;

/// What happened to one entry of a copied tree.
#[derive(Debug)]
pub enum CopyOutcome {
    Copied(PathBuf),
    Skipped(PathBuf),
    Failed { path: PathBuf, error: StorageError },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyReport {
    pub copied: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl CopyReport {
    pub fn from_outcomes(outcomes: &[CopyOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut report, outcome| {
            match outcome {
                CopyOutcome::Copied(_) => report.copied += 1,
                CopyOutcome::Skipped(_) => report.skipped += 1,
                CopyOutcome::Failed { .. } => report.failed += 1,
            }
            report
        })
    }
}

pub fn ensure_directory(path: &Path) -> Result<(), StorageError> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

/// Mirrors every file under `source` into `destination`.
///
/// With `skip_existing`, files already present at the destination are left
/// alone. A failing entry is reported as [`CopyOutcome::Failed`] and the walk
/// continues; only a missing source is an error.
pub fn copy_tree(
    source: &Path,
    destination: &Path,
    skip_existing: bool,
) -> Result<Vec<CopyOutcome>, StorageError> {
    if !source.is_dir() {
        return Err(StorageError::SourceMissing(source.to_path_buf()));
    }
    ensure_directory(destination)?;

    let mut outcomes = Vec::new();

    for entry in WalkDir::new(source).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| source.to_path_buf());
                warn!("Cannot read {}: {}", path.display(), e);
                outcomes.push(CopyOutcome::Failed {
                    path: path.clone(),
                    error: StorageError::Walk { path, source: e },
                });
                continue;
            }
        };

        let relative = match entry.path().strip_prefix(source) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            if let Err(error) = ensure_directory(&target) {
                warn!("{}", error);
                outcomes.push(CopyOutcome::Failed {
                    path: target,
                    error,
                });
            }
            continue;
        }

        if skip_existing && target.exists() {
            debug!("Skipping existing {}", target.display());
            outcomes.push(CopyOutcome::Skipped(target));
            continue;
        }

        let copied = target
            .parent()
            .map(ensure_directory)
            .unwrap_or(Ok(()))
            .and_then(|_| {
                std::fs::copy(entry.path(), &target).map_err(|e| StorageError::CopyFile {
                    from: entry.path().to_path_buf(),
                    to: target.clone(),
                    source: e,
                })
            });

        match copied {
            Ok(_) => outcomes.push(CopyOutcome::Copied(target)),
            Err(error) => {
                warn!("{}", error);
                outcomes.push(CopyOutcome::Failed {
                    path: target,
                    error,
                });
            }
        }
    }

    let report = CopyReport::from_outcomes(&outcomes);
    info!(
        "Copied {} -> {}: {} copied, {} skipped, {} failed",
        source.display(),
        destination.display(),
        report.copied,
        report.skipped,
        report.failed
    );
    Ok(outcomes)
}

/// File count and total size of a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TreeSummary {
    pub files: usize,
    pub bytes: u64,
}

pub fn summarize_tree(root: &Path) -> TreeSummary {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .fold(TreeSummary::default(), |mut summary, entry| {
            summary.files += 1;
            summary.bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
            summary
        })
}

//! Top-level runs: single catalog decrypt, asset tree decrypt, and the full
//! directory mirror that chains them with a plain copy.
//!
//! Fatal errors abort the remaining steps and propagate. Per-file and
//! per-table failures are folded into the returned reports and surface as
//! [`RunOutcome::CompletedWithFailures`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use log::{info, warn};
use serde::Serialize;

use crate::catalog::{
    rebuild_catalog, validate_catalog, CatalogMode, CatalogReader, KeyIndex, KeyIndexReport,
    RebuildReport, TableFailure,
};
use crate::cipher::BlockCipher;
use crate::config::Config;
use crate::db::{CipherStore, SqliteCipherStore};
use crate::error::{PreconditionError, Result};
use crate::pipeline::{DecryptionPipeline, LogProgress, PipelineConfig, PipelineStats, ProgressReporter};
use crate::secrets::DatabaseKey;
use crate::storage::{copy_tree, ensure_directory, summarize_tree, CopyReport, TreeSummary};

/// Exit status of a run that ended in a fatal error.
pub const FATAL_EXIT_CODE: i32 = -1;

const META_FILE: &str = "meta";
const MASTER_DIR: &str = "master";
const DAT_DIR: &str = "dat";
const DEFAULT_OUTPUT_DIR: &str = "decrypted";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    Success,
    CompletedWithFailures,
}

impl RunOutcome {
    pub fn from_failures(has_failures: bool) -> Self {
        if has_failures {
            RunOutcome::CompletedWithFailures
        } else {
            RunOutcome::Success
        }
    }

    pub fn exit_code(self) -> i32 {
        match self {
            RunOutcome::Success => 0,
            RunOutcome::CompletedWithFailures => 1,
        }
    }
}

/// Maps a run result to the process exit status: 0, 1, or -1 when fatal.
pub fn exit_code(result: &Result<RunOutcome>) -> i32 {
    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(_) => FATAL_EXIT_CODE,
    }
}

#[derive(Debug)]
pub struct DatabaseReport {
    pub mode: CatalogMode,
    pub tables_dumped: usize,
    pub rows_dumped: usize,
    pub dump_failures: Vec<TableFailure>,
    pub rebuild: RebuildReport,
    /// User tables found in the output; `None` when validation failed.
    pub validated_tables: Option<usize>,
}

impl DatabaseReport {
    pub fn has_failures(&self) -> bool {
        !self.dump_failures.is_empty() || !self.rebuild.failed.is_empty()
    }

    pub fn outcome(&self) -> RunOutcome {
        RunOutcome::from_failures(self.has_failures())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AssetReport {
    pub keys: KeyIndexReport,
    pub stats: PipelineStats,
}

impl AssetReport {
    pub fn outcome(&self) -> RunOutcome {
        RunOutcome::from_failures(self.stats.has_failures())
    }
}

#[derive(Debug)]
pub struct MirrorReport {
    pub output: PathBuf,
    pub catalog: DatabaseReport,
    pub copy: CopyReport,
    pub assets: AssetReport,
}

impl MirrorReport {
    pub fn outcome(&self) -> RunOutcome {
        RunOutcome::from_failures(
            self.catalog.has_failures() || self.copy.failed > 0 || self.assets.stats.has_failures(),
        )
    }
}

/// The expected input layout of a full mirror run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub root: PathBuf,
    pub meta: PathBuf,
    pub master: PathBuf,
    pub dat: PathBuf,
}

/// Checks that `root` holds a non-empty `meta` catalog and the `master/`
/// and `dat/` folders. Empty folders only warn.
pub fn validate_layout(root: &Path) -> std::result::Result<Layout, PreconditionError> {
    if !root.is_dir() {
        return Err(PreconditionError::MissingInput(root.to_path_buf()));
    }

    let layout = Layout {
        root: root.to_path_buf(),
        meta: root.join(META_FILE),
        master: root.join(MASTER_DIR),
        dat: root.join(DAT_DIR),
    };

    let meta_len = std::fs::metadata(&layout.meta)
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len())
        .ok_or_else(|| PreconditionError::MissingMetadata(layout.meta.clone()))?;
    if meta_len == 0 {
        return Err(PreconditionError::EmptyMetadata(layout.meta.clone()));
    }

    for folder in [&layout.master, &layout.dat] {
        if !folder.is_dir() {
            return Err(PreconditionError::MissingFolder(folder.clone()));
        }
        let empty = std::fs::read_dir(folder)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true);
        if empty {
            warn!("Folder is empty: {}", folder.display());
        }
    }

    info!("Input layout validated: {}", root.display());
    Ok(layout)
}

/// Read-only overview of an input root.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutInfo {
    pub meta_bytes: u64,
    pub meta_modified: Option<DateTime<Local>>,
    pub master: TreeSummary,
    pub dat: TreeSummary,
}

pub struct Orchestrator {
    config: Config,
    store: Box<dyn CipherStore>,
    cipher: Arc<dyn BlockCipher>,
    reporter: Arc<dyn ProgressReporter>,
}

impl Orchestrator {
    /// Builds an orchestrator over the linked SQLite engine and the block
    /// cipher described by `config.cipher`.
    pub fn new(config: Config) -> Result<Self> {
        let cipher = Arc::new(config.cipher.build()?);
        Ok(Self {
            config,
            store: Box::new(SqliteCipherStore),
            cipher,
            reporter: Arc::new(LogProgress),
        })
    }

    pub fn with_store(mut self, store: Box<dyn CipherStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_cipher(mut self, cipher: Arc<dyn BlockCipher>) -> Self {
        self.cipher = cipher;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn resolve_key(&self) -> Result<DatabaseKey> {
        Ok(DatabaseKey::resolve(self.config.database_key.as_deref())?)
    }

    /// Dumps the catalog at `input` and rebuilds it as a plain store at
    /// `output`.
    pub fn decrypt_database(&self, input: &Path, output: &Path) -> Result<DatabaseReport> {
        if !input.is_file() {
            return Err(PreconditionError::MissingDatabase(input.to_path_buf()).into());
        }
        let key = self.resolve_key()?;
        self.decrypt_database_with(input, output, &key)
    }

    fn decrypt_database_with(
        &self,
        input: &Path,
        output: &Path,
        key: &DatabaseKey,
    ) -> Result<DatabaseReport> {
        info!("Decrypting catalog {} -> {}", input.display(), output.display());

        let reader = CatalogReader::open(input, key, self.config.cipher_id, self.store.as_ref())?;
        let dump = reader.dumper().dump()?;
        let mode = reader.mode();
        drop(reader);

        let rebuild = rebuild_catalog(&dump.tables, output)?;

        let validated_tables = match validate_catalog(output) {
            Ok(count) => Some(count),
            Err(e) => {
                warn!("{}", e);
                None
            }
        };

        Ok(DatabaseReport {
            mode,
            tables_dumped: dump.tables.len(),
            rows_dumped: dump.total_rows(),
            dump_failures: dump.failed,
            rebuild,
            validated_tables,
        })
    }

    /// Decrypts every file under `input` into `output`, keyed by `catalog`.
    pub fn decrypt_assets(&self, input: &Path, output: &Path, catalog: &Path) -> Result<AssetReport> {
        if !input.is_dir() {
            return Err(PreconditionError::MissingInput(input.to_path_buf()).into());
        }
        if !catalog.is_file() {
            return Err(PreconditionError::MissingMetadata(catalog.to_path_buf()).into());
        }
        let key = self.resolve_key()?;
        self.decrypt_assets_with(input, output, catalog, &key)
    }

    fn decrypt_assets_with(
        &self,
        input: &Path,
        output: &Path,
        catalog: &Path,
        key: &DatabaseKey,
    ) -> Result<AssetReport> {
        let reader = CatalogReader::open(catalog, key, self.config.cipher_id, self.store.as_ref())?;
        let (index, keys) = KeyIndex::from_reader(&reader)?;
        drop(reader);

        ensure_directory(output)?;

        let config = PipelineConfig::from_config(&self.config, input, output);
        let pipeline = DecryptionPipeline::new(config, Arc::clone(&self.cipher))
            .with_reporter(Arc::clone(&self.reporter));
        let stats = pipeline.run(Arc::new(index))?;

        Ok(AssetReport { keys, stats })
    }

    /// Full run over an input root: catalog, plain copy of `master/`, then
    /// decryption of `dat/`. `output` defaults to `<root>/decrypted`.
    pub fn mirror(&self, root: &Path, output: Option<&Path>, overwrite: bool) -> Result<MirrorReport> {
        let layout = validate_layout(root)?;
        let key = self.resolve_key()?;
        let output = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.join(DEFAULT_OUTPUT_DIR));
        ensure_directory(&output)?;

        let meta_out = output.join(META_FILE);
        let catalog = self.decrypt_database_with(&layout.meta, &meta_out, &key)?;

        let skip_existing = self.config.skip_existing && !overwrite;
        let copied = copy_tree(&layout.master, &output.join(MASTER_DIR), skip_existing)?;
        let copy = CopyReport::from_outcomes(&copied);

        let assets = self.decrypt_assets_with(&layout.dat, &output.join(DAT_DIR), &meta_out, &key)?;

        let report = MirrorReport {
            output,
            catalog,
            copy,
            assets,
        };
        info!(
            "Mirror complete in {}: catalog {} tables, master {} copied / {} skipped / {} failed, dat {}",
            report.output.display(),
            report.catalog.rebuild.tables_written,
            report.copy.copied,
            report.copy.skipped,
            report.copy.failed,
            report.assets.stats
        );
        Ok(report)
    }

    /// Reports catalog size and folder statistics without writing anything.
    pub fn inspect(&self, root: &Path) -> Result<LayoutInfo> {
        let layout = validate_layout(root)?;
        let metadata = std::fs::metadata(&layout.meta).ok();

        let info = LayoutInfo {
            meta_bytes: metadata.as_ref().map(|m| m.len()).unwrap_or(0),
            meta_modified: metadata
                .and_then(|m| m.modified().ok())
                .map(DateTime::<Local>::from),
            master: summarize_tree(&layout.master),
            dat: summarize_tree(&layout.dat),
        };

        info!("meta: {} bytes", info.meta_bytes);
        if let Some(modified) = info.meta_modified {
            info!("meta modified: {}", modified.format("%Y-%m-%d %H:%M:%S"));
        }
        info!("master: {} files, {} bytes", info.master.files, info.master.bytes);
        info!("dat: {} files, {} bytes", info.dat.files, info.dat.bytes);
        Ok(info)
    }
}

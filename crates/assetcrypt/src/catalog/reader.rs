use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::db::{probe, CipherStore, RowAccess, SqliteHandle, StoreError, StoreHandle};
use crate::error::{CatalogError, KeyResolutionError, PreconditionError, Result};
use crate::secrets::DatabaseKey;

use super::dump::TableDumper;
use super::record::MetadataRecord;

/// Fixed projection of the asset table: type, name, path key, checksum,
/// dependencies, key.
const RECORD_SQL: &str = "SELECT m, n, h, c, d, e FROM a";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogMode {
    /// Already decrypted; opened as a plain store.
    Plain,
    /// Opened through the cipher store with a key.
    Encrypted,
}

impl std::fmt::Display for CatalogMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogMode::Plain => write!(f, "plain"),
            CatalogMode::Encrypted => write!(f, "encrypted"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    pub rows: usize,
    pub records: usize,
    pub skipped: usize,
}

/// An opened metadata catalog.
pub struct CatalogReader {
    handle: Box<dyn StoreHandle>,
    mode: CatalogMode,
    path: PathBuf,
}

impl std::fmt::Debug for CatalogReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogReader")
            .field("mode", &self.mode)
            .field("path", &self.path)
            .finish()
    }
}

impl CatalogReader {
    /// Opens `path`, detecting whether it is still encrypted.
    ///
    /// A plain open plus probe is tried first. When that fails the catalog is
    /// opened through `store` with `cipher_id` and `key`. A catalog that
    /// opens under neither mode yields [`CatalogError::Ambiguous`]; one whose
    /// probe fails after keying yields [`KeyResolutionError::Unreadable`].
    pub fn open(
        path: &Path,
        key: &DatabaseKey,
        cipher_id: u32,
        store: &dyn CipherStore,
    ) -> Result<Self> {
        if !path.is_file() {
            return Err(PreconditionError::MissingMetadata(path.to_path_buf()).into());
        }

        let plain_error = match Self::open_plain(path) {
            Ok(reader) => {
                info!("Catalog '{}' is already decrypted", path.display());
                return Ok(reader);
            }
            Err(e) => e,
        };
        debug!(
            "Plain open of '{}' failed ({}), trying cipher store",
            path.display(),
            plain_error.diagnostic()
        );

        let handle = store.open(path).map_err(|e| CatalogError::Ambiguous {
            path: path.to_path_buf(),
            plain: plain_error.diagnostic(),
            cipher: e.diagnostic(),
        })?;

        Self::unlock(handle, path, key, cipher_id)
    }

    /// Opens `path` as a plain store and probes it.
    pub fn open_plain(path: &Path) -> std::result::Result<Self, StoreError> {
        let handle = SqliteHandle::open_read_only(path)?;
        probe(&handle)?;
        Ok(Self {
            handle: Box::new(handle),
            mode: CatalogMode::Plain,
            path: path.to_path_buf(),
        })
    }

    fn unlock(
        mut handle: Box<dyn StoreHandle>,
        path: &Path,
        key: &DatabaseKey,
        cipher_id: u32,
    ) -> Result<Self> {
        let rejected = |source: StoreError| KeyResolutionError::KeyRejected {
            path: path.to_path_buf(),
            source,
        };
        handle.set_cipher_mode(cipher_id).map_err(rejected)?;
        handle.set_key(key.expose()).map_err(rejected)?;

        probe(handle.as_ref()).map_err(|e| KeyResolutionError::Unreadable {
            path: path.to_path_buf(),
            diagnostic: e.diagnostic(),
        })?;

        info!(
            "Opened encrypted catalog '{}' (cipher {})",
            path.display(),
            cipher_id
        );
        Ok(Self {
            handle,
            mode: CatalogMode::Encrypted,
            path: path.to_path_buf(),
        })
    }

    pub fn mode(&self) -> CatalogMode {
        self.mode
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn handle(&self) -> &dyn StoreHandle {
        self.handle.as_ref()
    }

    pub fn dumper(&self) -> TableDumper<'_> {
        TableDumper::new(self.handle())
    }

    /// Streams every usable record of the asset table to `visit`.
    ///
    /// Rows with an empty type, name or path key, or with an unreadable
    /// column, are skipped with a warning.
    pub fn stream(&self, visit: &mut dyn FnMut(MetadataRecord)) -> Result<ReadStats> {
        let mut stats = ReadStats::default();

        self.handle
            .for_each_row(RECORD_SQL, &mut |row| {
                stats.rows += 1;
                match record_from_row(row) {
                    Ok(Some(record)) => {
                        stats.records += 1;
                        visit(record);
                    }
                    Ok(None) => {
                        stats.skipped += 1;
                    }
                    Err(e) => {
                        warn!("Skipping unreadable catalog row {}: {}", stats.rows, e);
                        stats.skipped += 1;
                    }
                }
            })
            .map_err(|source| CatalogError::Read {
                path: self.path.clone(),
                source,
            })?;

        info!(
            "Read {} records from '{}' ({} rows, {} skipped)",
            stats.records,
            self.path.display(),
            stats.rows,
            stats.skipped
        );
        Ok(stats)
    }

    pub fn read_all(&self) -> Result<(Vec<MetadataRecord>, ReadStats)> {
        let mut records = Vec::new();
        let stats = self.stream(&mut |record| records.push(record))?;
        Ok((records, stats))
    }
}

fn record_from_row(row: &dyn RowAccess) -> std::result::Result<Option<MetadataRecord>, StoreError> {
    let text = |index: usize| -> std::result::Result<String, StoreError> {
        Ok(row.column_text(index)?.unwrap_or_default())
    };
    let optional = |index: usize| -> std::result::Result<Option<String>, StoreError> {
        Ok(row.column_text(index)?.filter(|v| !v.trim().is_empty()))
    };

    let kind = text(0)?;
    let name = text(1)?;
    let path_key = text(2)?;

    if kind.is_empty() || name.is_empty() || path_key.is_empty() {
        warn!(
            "Skipping catalog row with missing fields (type='{}', name='{}', path='{}')",
            kind, name, path_key
        );
        return Ok(None);
    }

    Ok(Some(MetadataRecord {
        kind,
        name,
        path_key,
        checksum: optional(3)?,
        dependencies: text(4)?,
        key: optional(5)?,
    }))
}

//! rusqlite-backed store handles.
//!
//! The same handle serves both open modes. Cipher selection and keying are
//! issued as the cipher extension's pragmas (`PRAGMA cipher`, `PRAGMA hexkey`);
//! an engine without the extension ignores them, and the readability probe
//! then reports the content as unreadable.

use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};

use super::{CipherStore, RowAccess, StoreError, StoreHandle};

/// Maps a numeric cipher id to the cipher extension's pragma name.
pub fn cipher_name(cipher_id: u32) -> Option<&'static str> {
    match cipher_id {
        1 => Some("aes128cbc"),
        2 => Some("aes256cbc"),
        3 => Some("chacha20"),
        4 => Some("sqlcipher"),
        5 => Some("rc4"),
        6 => Some("ascon128"),
        _ => None,
    }
}

/// A single rusqlite connection implementing [`StoreHandle`].
pub struct SqliteHandle {
    conn: Connection,
    path: PathBuf,
}

impl SqliteHandle {
    /// Opens an existing store read-only. Opening succeeds even for
    /// encrypted or non-database files; only the first query detects that.
    pub fn open_read_only(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StoreHandle for SqliteHandle {
    fn set_cipher_mode(&mut self, cipher_id: u32) -> Result<(), StoreError> {
        let name = cipher_name(cipher_id).ok_or(StoreError::UnsupportedCipher(cipher_id))?;
        log::debug!("Setting cipher '{}' (id {}) on {}", name, cipher_id, self.path.display());
        self.execute(&format!("PRAGMA cipher = '{}'", name))
    }

    fn set_key(&mut self, key: &[u8]) -> Result<(), StoreError> {
        // Hex digits only, safe to inline.
        let sql = format!("PRAGMA hexkey = '{}'", hex::encode(key));
        self.execute(&sql).map_err(|e| match e {
            StoreError::Query { source, .. } | StoreError::Step { source, .. } => {
                StoreError::Key(source)
            }
            other => other,
        })
    }

    fn for_each_row(
        &self,
        sql: &str,
        visit: &mut dyn FnMut(&dyn RowAccess),
    ) -> Result<(), StoreError> {
        let mut stmt = self.conn.prepare(sql).map_err(|source| StoreError::Query {
            sql: sql.to_string(),
            source,
        })?;
        let names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = stmt.query([]).map_err(|source| StoreError::Query {
            sql: sql.to_string(),
            source,
        })?;

        loop {
            match rows.next() {
                Ok(Some(row)) => visit(&SqliteRow {
                    row,
                    names: &names,
                }),
                Ok(None) => break,
                Err(source) => {
                    return Err(StoreError::Step {
                        sql: sql.to_string(),
                        source,
                    })
                }
            }
        }

        Ok(())
    }
}

struct SqliteRow<'a, 'stmt> {
    row: &'a Row<'stmt>,
    names: &'a [String],
}

impl RowAccess for SqliteRow<'_, '_> {
    fn column_count(&self) -> usize {
        self.names.len()
    }

    fn column_name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    fn column_text(&self, index: usize) -> Result<Option<String>, StoreError> {
        let value = self
            .row
            .get_ref(index)
            .map_err(|source| StoreError::Column { index, source })?;
        Ok(value_to_text(value))
    }
}

/// Text coercion matching the engine's own `column_text` rendering.
fn value_to_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(r) => {
            if r.is_finite() && r.fract() == 0.0 && r.abs() < 1e15 {
                Some(format!("{:.1}", r))
            } else {
                Some(r.to_string())
            }
        }
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// [`CipherStore`] over the linked SQLite engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteCipherStore;

impl CipherStore for SqliteCipherStore {
    fn open(&self, path: &Path) -> Result<Box<dyn StoreHandle>, StoreError> {
        Ok(Box::new(SqliteHandle::open_read_only(path)?))
    }
}

//! Builders for catalog fixtures and fake stores.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};

use assetcrypt::db::{CipherStore, RowAccess, SqliteHandle, StoreError, StoreHandle};

/// One row of the asset table.
#[derive(Debug, Clone)]
pub struct AssetRow {
    pub kind: String,
    pub name: String,
    pub path_key: String,
    pub key: Option<String>,
}

/// Builder for metadata catalog files with an asset table `a`.
#[derive(Default)]
pub struct CatalogBuilder {
    rows: Vec<AssetRow>,
    extra_sql: Vec<String>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an asset whose key is stored as an integer.
    pub fn asset(mut self, path_key: &str, key: i64) -> Self {
        self.rows.push(AssetRow {
            kind: "tex".to_string(),
            name: format!("asset/{}", path_key),
            path_key: path_key.to_string(),
            key: Some(key.to_string()),
        });
        self
    }

    /// Adds an asset with an arbitrary name and raw key text.
    pub fn raw(mut self, kind: &str, name: &str, path_key: &str, key: Option<&str>) -> Self {
        self.rows.push(AssetRow {
            kind: kind.to_string(),
            name: name.to_string(),
            path_key: path_key.to_string(),
            key: key.map(str::to_string),
        });
        self
    }

    /// Extra statements run after the asset table is filled.
    pub fn sql(mut self, statement: &str) -> Self {
        self.extra_sql.push(statement.to_string());
        self
    }

    pub fn build(self, path: &Path) -> PathBuf {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create catalog directory");
        }
        let conn = Connection::open(path).expect("Failed to create catalog");
        conn.execute_batch(
            "CREATE TABLE a (i INTEGER PRIMARY KEY, m TEXT, n TEXT, h TEXT, c TEXT, d TEXT, e INTEGER);",
        )
        .expect("Failed to create asset table");

        for row in &self.rows {
            conn.execute(
                "INSERT INTO a (m, n, h, c, d, e) VALUES (?1, ?2, ?3, NULL, '', ?4)",
                params![row.kind, row.name, row.path_key, row.key],
            )
            .expect("Failed to insert asset row");
        }

        for statement in &self.extra_sql {
            conn.execute_batch(statement).expect("Failed to run fixture SQL");
        }

        path.to_path_buf()
    }
}

/// A cipher store that serves a plain backing catalog but fails every query
/// until a cipher mode and the expected key have been applied.
pub struct LockedStore {
    pub backing: PathBuf,
    pub expected_key: Vec<u8>,
    pub expected_cipher: u32,
}

struct LockedHandle {
    inner: SqliteHandle,
    expected_key: Vec<u8>,
    expected_cipher: u32,
    cipher: Option<u32>,
    unlocked: bool,
}

impl StoreHandle for LockedHandle {
    fn set_cipher_mode(&mut self, cipher_id: u32) -> Result<(), StoreError> {
        self.cipher = Some(cipher_id);
        Ok(())
    }

    fn set_key(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.unlocked =
            self.cipher == Some(self.expected_cipher) && key == self.expected_key.as_slice();
        Ok(())
    }

    fn for_each_row(
        &self,
        sql: &str,
        visit: &mut dyn FnMut(&dyn RowAccess),
    ) -> Result<(), StoreError> {
        if !self.unlocked {
            return Err(StoreError::Other("file is not a database".to_string()));
        }
        self.inner.for_each_row(sql, visit)
    }
}

impl CipherStore for LockedStore {
    fn open(&self, _path: &Path) -> Result<Box<dyn StoreHandle>, StoreError> {
        Ok(Box::new(LockedHandle {
            inner: SqliteHandle::open_read_only(&self.backing)?,
            expected_key: self.expected_key.clone(),
            expected_cipher: self.expected_cipher,
            cipher: None,
            unlocked: false,
        }))
    }
}

/// A cipher store whose engine refuses to open anything.
pub struct UnopenableStore;

impl CipherStore for UnopenableStore {
    fn open(&self, path: &Path) -> Result<Box<dyn StoreHandle>, StoreError> {
        Err(StoreError::Other(format!(
            "cipher extension unavailable for {}",
            path.display()
        )))
    }
}

/// Bytes that no plain store will open.
pub fn write_opaque(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create directory");
    }
    std::fs::write(path, vec![0xC3u8; 4096]).expect("Failed to write opaque file");
}

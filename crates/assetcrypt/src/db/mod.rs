//! Relational store access.
//!
//! Catalog code talks to a store only through [`StoreHandle`] and
//! [`RowAccess`], so the same dump and read logic runs against a plain
//! SQLite file or one opened through a cipher extension ([`CipherStore`]).
//! Handles are not shared between threads; all catalog access is sequential.

use std::path::Path;

pub mod error;
pub mod sqlite;

pub use error::StoreError;
pub use sqlite::{SqliteCipherStore, SqliteHandle};

/// Readability probe run against the system catalog table.
pub const PROBE_SQL: &str = "SELECT name FROM sqlite_master LIMIT 1";

/// Lists user tables, excluding the store's internal ones.
pub const LIST_TABLES_SQL: &str =
    "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'";

/// One row of a running query.
pub trait RowAccess {
    fn column_count(&self) -> usize;

    fn column_name(&self, index: usize) -> Option<&str>;

    /// Returns the column coerced to text, regardless of its declared type.
    /// `None` means SQL NULL.
    fn column_text(&self, index: usize) -> Result<Option<String>, StoreError>;
}

/// An opened store connection.
pub trait StoreHandle {
    /// Selects the cipher used by the cipher extension. Must precede `set_key`.
    fn set_cipher_mode(&mut self, cipher_id: u32) -> Result<(), StoreError>;

    fn set_key(&mut self, key: &[u8]) -> Result<(), StoreError>;

    /// Runs a statement to completion, discarding any rows it yields.
    fn execute(&self, sql: &str) -> Result<(), StoreError> {
        self.for_each_row(sql, &mut |_| {})
    }

    /// Prepares `sql` and steps through every row, handing each to `visit`.
    fn for_each_row(
        &self,
        sql: &str,
        visit: &mut dyn FnMut(&dyn RowAccess),
    ) -> Result<(), StoreError>;
}

/// Opens stores through a cipher-extended engine.
pub trait CipherStore {
    fn open(&self, path: &Path) -> Result<Box<dyn StoreHandle>, StoreError>;
}

/// Runs [`PROBE_SQL`]; fails when the store content is unreadable.
pub fn probe(handle: &dyn StoreHandle) -> Result<(), StoreError> {
    handle.execute(PROBE_SQL)
}

/// Quotes an identifier for interpolation into SQL.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

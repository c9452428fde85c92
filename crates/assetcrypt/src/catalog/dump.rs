//! Schema-agnostic table dumping.
//!
//! Every user table is read with `SELECT *` and each cell coerced to text,
//! whatever its declared type. A table whose query or rows fail is left out of
//! the result and reported in [`TableDump::failed`]; the rest still dump.

use log::{debug, error, info};

use crate::db::{quote_identifier, StoreError, StoreHandle, LIST_TABLES_SQL};
use crate::error::CatalogError;

/// An ordered list of `(column, value)` cells. `None` is SQL NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenericRow {
    cells: Vec<(String, Option<String>)>,
}

impl GenericRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<String>, value: Option<String>) {
        self.cells.push((column.into(), value));
    }

    /// `None` when the row has no such column, `Some(None)` for NULL.
    pub fn get(&self, column: &str) -> Option<Option<&str>> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_deref())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn cells(&self) -> &[(String, Option<String>)] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Option<String>)> for GenericRow {
    fn from_iter<I: IntoIterator<Item = (S, Option<String>)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().map(|(c, v)| (c.into(), v)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericTable {
    pub name: String,
    pub rows: Vec<GenericRow>,
}

impl GenericTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    /// The column set, as defined by the first row.
    pub fn columns(&self) -> Vec<&str> {
        self.rows
            .first()
            .map(|row| row.columns().collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFailure {
    pub table: String,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct TableDump {
    pub tables: Vec<GenericTable>,
    pub failed: Vec<TableFailure>,
}

impl TableDump {
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows.len()).sum()
    }
}

pub struct TableDumper<'a> {
    handle: &'a dyn StoreHandle,
}

impl<'a> TableDumper<'a> {
    pub fn new(handle: &'a dyn StoreHandle) -> Self {
        Self { handle }
    }

    /// Names of all user tables, in catalog order.
    pub fn list_tables(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        self.handle.for_each_row(LIST_TABLES_SQL, &mut |row| {
            match row.column_text(0) {
                Ok(Some(name)) if !name.is_empty() => names.push(name),
                Ok(_) => {}
                Err(e) => error!("Error reading table name: {}", e),
            }
        })?;
        Ok(names)
    }

    /// Dumps every user table. Only the table listing itself is fatal.
    pub fn dump(&self) -> Result<TableDump, CatalogError> {
        let names = self.list_tables().map_err(CatalogError::ListTables)?;
        info!("Found {} tables: {}", names.len(), names.join(", "));

        let mut result = TableDump::default();
        for name in names {
            match self.dump_table(&name) {
                Ok(table) => {
                    info!("Table '{}': {} rows", name, table.rows.len());
                    result.tables.push(table);
                }
                Err(e) => {
                    error!("Failed to read table '{}': {}", name, e);
                    result.failed.push(TableFailure {
                        table: name,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(result)
    }

    pub fn dump_table(&self, name: &str) -> Result<GenericTable, StoreError> {
        let sql = format!("SELECT * FROM {}", quote_identifier(name));
        debug!("Dumping table with: {}", sql);

        let mut table = GenericTable::new(name);
        let mut row_error: Option<StoreError> = None;

        self.handle.for_each_row(&sql, &mut |row| {
            if row_error.is_some() {
                return;
            }
            let mut generic = GenericRow::new();
            for i in 0..row.column_count() {
                let column = row
                    .column_name(i)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("column_{}", i));
                match row.column_text(i) {
                    Ok(value) => generic.push(column, value),
                    Err(e) => {
                        row_error = Some(e);
                        return;
                    }
                }
            }
            table.rows.push(generic);
        })?;

        match row_error {
            Some(e) => Err(e),
            None => Ok(table),
        }
    }
}

//! Writes dumped tables into a fresh plaintext store.
//!
//! Every column is created as `TEXT`; the column list of each table comes
//! from its first row. All tables share one transaction that commits once at
//! the end, and each table runs in its own savepoint so a failing table rolls
//! back alone.

use std::path::Path;

use log::{debug, error, info, warn};
use rusqlite::{params_from_iter, Connection, OpenFlags, Savepoint};

use crate::db::quote_identifier;
use crate::error::CatalogError;

use super::dump::{GenericTable, TableFailure};

#[derive(Debug, Default)]
pub struct RebuildReport {
    pub tables_written: usize,
    pub rows_written: usize,
    pub skipped_empty: usize,
    pub failed: Vec<TableFailure>,
}

fn rebuild_error(path: &Path, e: impl std::fmt::Display) -> CatalogError {
    CatalogError::Rebuild {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

/// Rebuilds `tables` into a new store at `output`, replacing any existing file.
pub fn rebuild_catalog(
    tables: &[GenericTable],
    output: &Path,
) -> Result<RebuildReport, CatalogError> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| CatalogError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    if output.exists() {
        debug!("Removing existing catalog at {}", output.display());
        std::fs::remove_file(output).map_err(|source| CatalogError::Io {
            path: output.to_path_buf(),
            source,
        })?;
    }

    let mut conn = Connection::open(output).map_err(|e| rebuild_error(output, e))?;
    let mut tx = conn.transaction().map_err(|e| rebuild_error(output, e))?;
    let mut report = RebuildReport::default();

    for table in tables {
        if table.is_empty() {
            debug!("Skipping empty table '{}'", table.name);
            report.skipped_empty += 1;
            continue;
        }

        let savepoint = tx.savepoint().map_err(|e| rebuild_error(output, e))?;
        match write_table(&savepoint, table) {
            Ok(rows) => {
                savepoint.commit().map_err(|e| rebuild_error(output, e))?;
                info!("Rebuilt table '{}' with {} rows", table.name, rows);
                report.tables_written += 1;
                report.rows_written += rows;
            }
            Err(e) => {
                // Dropping the savepoint rolls the table back.
                error!("Failed to rebuild table '{}': {}", table.name, e);
                report.failed.push(TableFailure {
                    table: table.name.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    tx.commit().map_err(|e| rebuild_error(output, e))?;

    info!(
        "Catalog rebuilt at {}: {} tables, {} rows ({} empty skipped, {} failed)",
        output.display(),
        report.tables_written,
        report.rows_written,
        report.skipped_empty,
        report.failed.len()
    );
    Ok(report)
}

fn write_table(conn: &Savepoint<'_>, table: &GenericTable) -> rusqlite::Result<usize> {
    let columns = table.columns();
    let quoted: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();

    let create = format!(
        "CREATE TABLE {} ({})",
        quote_identifier(&table.name),
        quoted
            .iter()
            .map(|c| format!("{} TEXT", c))
            .collect::<Vec<_>>()
            .join(", ")
    );
    conn.execute(&create, [])?;

    let placeholders = (1..=columns.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let insert = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(&table.name),
        quoted.join(", "),
        placeholders
    );

    let mut stmt = conn.prepare(&insert)?;
    let mut written = 0;
    for (i, row) in table.rows.iter().enumerate() {
        let extra = row.columns().filter(|c| !columns.contains(c)).count();
        if extra > 0 {
            warn!(
                "Row {} of '{}' has {} columns not in the first row, dropping them",
                i, table.name, extra
            );
        }
        let values = columns.iter().map(|c| row.get(c).flatten());
        stmt.execute(params_from_iter(values))?;
        written += 1;
    }

    Ok(written)
}

/// Checks that a rebuilt catalog exists, is non-empty and opens as a plain
/// store. Returns the number of user tables.
pub fn validate_catalog(path: &Path) -> Result<usize, CatalogError> {
    let metadata = std::fs::metadata(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if metadata.len() == 0 {
        return Err(CatalogError::Validation {
            path: path.to_path_buf(),
            reason: "file is empty".to_string(),
        });
    }

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| validation_error(path, e))?;
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
            [],
            |row| row.get(0),
        )
        .map_err(|e| validation_error(path, e))?;

    info!(
        "Validated {}: {} tables, {} bytes",
        path.display(),
        count,
        metadata.len()
    );
    Ok(usize::try_from(count).unwrap_or_default())
}

fn validation_error(path: &Path, e: rusqlite::Error) -> CatalogError {
    CatalogError::Validation {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::dump::{GenericRow, TableDumper};
    use crate::db::SqliteHandle;

    fn row(cells: &[(&str, Option<&str>)]) -> GenericRow {
        cells
            .iter()
            .map(|(c, v)| (c.to_string(), v.map(str::to_string)))
            .collect()
    }

    fn table(name: &str, rows: Vec<GenericRow>) -> GenericTable {
        GenericTable {
            name: name.to_string(),
            rows,
        }
    }

    #[test]
    fn test_rebuild_writes_text_columns() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("nested").join("out.db");
        let tables = vec![table(
            "a",
            vec![
                row(&[("n", Some("x")), ("e", Some("42"))]),
                row(&[("n", Some("y")), ("e", None)]),
            ],
        )];

        let report = rebuild_catalog(&tables, &output).unwrap();
        assert_eq!(report.tables_written, 1);
        assert_eq!(report.rows_written, 2);

        let conn = Connection::open(&output).unwrap();
        let (value, kind): (String, String) = conn
            .query_row("SELECT e, typeof(e) FROM a WHERE n = 'x'", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(value, "42");
        assert_eq!(kind, "text");

        let declared: String = conn
            .query_row(
                "SELECT type FROM pragma_table_info('a') WHERE name = 'e'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(declared, "TEXT");
    }

    #[test]
    fn test_missing_columns_become_null() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.db");
        let tables = vec![table(
            "t",
            vec![
                row(&[("a", Some("1")), ("b", Some("2"))]),
                row(&[("a", Some("3"))]),
            ],
        )];

        rebuild_catalog(&tables, &output).unwrap();

        let conn = Connection::open(&output).unwrap();
        let b: Option<String> = conn
            .query_row("SELECT b FROM t WHERE a = '3'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(b, None);
    }

    #[test]
    fn test_empty_tables_are_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.db");
        let tables = vec![
            table("empty", vec![]),
            table("full", vec![row(&[("x", Some("1"))])]),
        ];

        let report = rebuild_catalog(&tables, &output).unwrap();
        assert_eq!(report.skipped_empty, 1);
        assert_eq!(validate_catalog(&output).unwrap(), 1);
    }

    #[test]
    fn test_failing_table_does_not_abort_others() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.db");
        // The second table of the same name fails at CREATE TABLE.
        let tables = vec![
            table("t", vec![row(&[("x", Some("1"))])]),
            table("t", vec![row(&[("y", Some("2"))])]),
            table("u", vec![row(&[("z", Some("3"))])]),
        ];

        let report = rebuild_catalog(&tables, &output).unwrap();
        assert_eq!(report.tables_written, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].table, "t");

        let conn = Connection::open(&output).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_rebuild_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.db");
        std::fs::write(&output, b"not a database").unwrap();

        rebuild_catalog(&[table("t", vec![row(&[("x", Some("1"))])])], &output).unwrap();
        assert_eq!(validate_catalog(&output).unwrap(), 1);
    }

    #[test]
    fn test_dump_then_rebuild_preserves_content() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src.db");
        let output = dir.path().join("out.db");
        let conn = Connection::open(&source).unwrap();
        conn.execute_batch(
            "CREATE TABLE a (m TEXT, n TEXT, e INTEGER, r REAL);
             INSERT INTO a VALUES ('t', 'one', 1, 0.5);
             INSERT INTO a VALUES ('t', 'two', NULL, 2.0);
             CREATE TABLE b (k TEXT);
             INSERT INTO b VALUES ('v');
             CREATE TABLE c (k TEXT);",
        )
        .unwrap();
        drop(conn);

        let handle = SqliteHandle::open_read_only(&source).unwrap();
        let original = TableDumper::new(&handle).dump().unwrap();
        rebuild_catalog(&original.tables, &output).unwrap();

        let rebuilt_handle = SqliteHandle::open_read_only(&output).unwrap();
        let rebuilt = TableDumper::new(&rebuilt_handle).dump().unwrap();

        let non_empty: Vec<_> = original.tables.iter().filter(|t| !t.is_empty()).collect();
        assert_eq!(rebuilt.tables.len(), non_empty.len());
        for table in non_empty {
            let copy = rebuilt.tables.iter().find(|t| t.name == table.name).unwrap();
            assert_eq!(copy, table);
        }
    }

    #[test]
    fn test_validate_rejects_empty_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.db");
        std::fs::write(&empty, b"").unwrap();

        assert!(matches!(
            validate_catalog(&empty),
            Err(CatalogError::Validation { .. })
        ));
        assert!(matches!(
            validate_catalog(&dir.path().join("missing.db")),
            Err(CatalogError::Io { .. })
        ));
    }
}

//! Store error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the relational store capability.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store file could not be opened.
    #[error("Failed to open store '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The cipher extension refused the key.
    #[error("Failed to apply key: {0}")]
    Key(#[source] rusqlite::Error),

    /// The cipher id has no known cipher-extension name.
    #[error("Unsupported cipher id {0}")]
    UnsupportedCipher(u32),

    /// Preparing or executing a statement failed.
    #[error("Query failed ({sql}): {source}")]
    Query {
        sql: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Advancing a cursor failed mid-result.
    #[error("Step failed ({sql}): {source}")]
    Step {
        sql: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A column could not be read as text.
    #[error("Failed to read column {index}: {source}")]
    Column {
        index: usize,
        #[source]
        source: rusqlite::Error,
    },

    /// Failure raised by a non-sqlite store implementation.
    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// The driver's diagnostic text, without the wrapping context.
    pub fn diagnostic(&self) -> String {
        match self {
            StoreError::Open { source, .. }
            | StoreError::Key(source)
            | StoreError::Query { source, .. }
            | StoreError::Step { source, .. }
            | StoreError::Column { source, .. } => source.to_string(),
            other => other.to_string(),
        }
    }
}

use std::path::PathBuf;
use thiserror::Error;

pub use crate::cipher::DecryptionError;
pub use crate::db::StoreError;

#[derive(Error, Debug)]
pub enum AssetCryptError {
    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    #[error("Key resolution failed: {0}")]
    KeyResolution(#[from] KeyResolutionError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

#[derive(Error, Debug)]
pub enum PreconditionError {
    #[error("Input directory does not exist: {0}")]
    MissingInput(PathBuf),

    #[error("Metadata catalog does not exist: {0}")]
    MissingMetadata(PathBuf),

    #[error("Metadata catalog is empty: {0}")]
    EmptyMetadata(PathBuf),

    #[error("Required folder missing: {0}")]
    MissingFolder(PathBuf),

    #[error("Input database file does not exist: {0}")]
    MissingDatabase(PathBuf),
}

#[derive(Error, Debug)]
pub enum KeyResolutionError {
    #[error("Invalid hex key: {reason}")]
    MalformedHexKey { reason: String },

    #[error("Cipher store rejected the key for '{path}': {source}")]
    KeyRejected {
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    #[error("Failed to decrypt catalog '{path}', check the key: {diagnostic}")]
    Unreadable { path: PathBuf, diagnostic: String },
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error(
        "Catalog '{path}' opens under neither mode (plain: {plain}; cipher: {cipher})"
    )]
    Ambiguous {
        path: PathBuf,
        plain: String,
        cipher: String,
    },

    #[error("Failed to read catalog '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    #[error("Failed to enumerate tables: {0}")]
    ListTables(#[source] StoreError),

    #[error("Failed to rebuild catalog at '{path}': {reason}")]
    Rebuild { path: PathBuf, reason: String },

    #[error("Rebuilt catalog '{path}' failed validation: {reason}")]
    Validation { path: PathBuf, reason: String },

    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy file from '{from}' to '{to}': {source}")]
    CopyFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk '{path}': {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Source directory not found: {0}")]
    SourceMissing(PathBuf),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,

    #[error("Directory scan failed for '{path}': {source}")]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Why a single file could not be mirrored. Never escalates past the pipeline.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("No decryption key found for '{identifier}'")]
    NoKey { identifier: String },

    #[error("Failed to create output directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Decryption failed: {0}")]
    Decrypt(#[from] DecryptionError),

    #[error("Worker panicked: {message}")]
    Panicked { message: String },
}

pub type Result<T> = std::result::Result<T, AssetCryptError>;

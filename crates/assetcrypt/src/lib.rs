pub mod catalog;
pub mod cipher;
pub mod config;
pub mod db;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod secrets;
pub mod storage;
pub mod worker;

pub use catalog::{CatalogMode, CatalogReader, KeyIndex, KeyLookup, MetadataRecord};
pub use cipher::{BlockCipher, XorBlockCipher};
pub use config::{load_config, Config};
pub use db::{CipherStore, SqliteCipherStore};
pub use error::{AssetCryptError, ConfigError, KeyResolutionError, PreconditionError, Result};
pub use orchestrator::{exit_code, Orchestrator, RunOutcome, FATAL_EXIT_CODE};
pub use pipeline::{DecryptionPipeline, PipelineConfig, PipelineStats};
pub use secrets::DatabaseKey;

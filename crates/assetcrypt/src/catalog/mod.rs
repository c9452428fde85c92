//! Metadata catalog extraction.
//!
//! - [`reader`] opens a catalog (plain or cipher-extended) and streams
//!   [`MetadataRecord`]s.
//! - [`key_index`] folds records into the filename → key [`KeyIndex`].
//! - [`dump`] materializes every user table as text-only [`GenericTable`]s.
//! - [`rebuild`] writes dumped tables into a fresh plaintext store.

pub mod dump;
pub mod key_index;
pub mod reader;
pub mod rebuild;
pub mod record;

pub use dump::{GenericRow, GenericTable, TableDump, TableDumper, TableFailure};
pub use key_index::{KeyIndex, KeyIndexBuilder, KeyIndexReport, KeyLookup};
pub use reader::{CatalogMode, CatalogReader, ReadStats};
pub use rebuild::{rebuild_catalog, validate_catalog, RebuildReport};
pub use record::MetadataRecord;

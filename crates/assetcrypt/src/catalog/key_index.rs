//! File identifier → decryption key index.
//!
//! Identifiers are matched case-insensitively. When two records share an
//! identifier the first one seen wins; later ones are counted as duplicates
//! and logged, never treated as errors.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use log::{info, warn};

use crate::error::Result;

use super::reader::CatalogReader;
use super::record::MetadataRecord;

/// Outcome of a key lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLookup {
    Found(i64),
    NotFound,
}

/// Read-only mapping from file identifier to key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyIndex {
    keys: HashMap<String, i64>,
}

impl KeyIndex {
    /// Builds an index from `(identifier, key)` pairs; first occurrence wins.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: AsRef<str>,
    {
        let mut keys = HashMap::new();
        for (identifier, key) in pairs {
            keys.entry(normalize(identifier.as_ref())).or_insert(key);
        }
        Self { keys }
    }

    /// Streams the asset table of `reader` into a new index.
    pub fn from_reader(reader: &CatalogReader) -> Result<(Self, KeyIndexReport)> {
        let mut builder = KeyIndexBuilder::new();
        reader.stream(&mut |record| builder.push(&record))?;
        Ok(builder.build())
    }

    pub fn lookup(&self, identifier: &str) -> KeyLookup {
        match self.keys.get(&normalize(identifier)) {
            Some(key) => KeyLookup::Found(*key),
            None => KeyLookup::NotFound,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn normalize(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyIndexReport {
    pub records: usize,
    pub indexed: usize,
    pub duplicates: usize,
    pub missing_key: usize,
    pub unparsable: usize,
}

impl KeyIndexReport {
    pub fn warnings(&self) -> usize {
        self.duplicates + self.missing_key + self.unparsable
    }
}

#[derive(Debug, Default)]
pub struct KeyIndexBuilder {
    keys: HashMap<String, i64>,
    report: KeyIndexReport,
}

impl KeyIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: &MetadataRecord) {
        self.report.records += 1;

        let Some(raw) = record.key.as_deref() else {
            warn!("No key for '{}' ({}), skipping", record.name, record.path_key);
            self.report.missing_key += 1;
            return;
        };

        let key = match raw.trim().parse::<i64>() {
            Ok(key) => key,
            Err(e) => {
                warn!(
                    "Unparsable key '{}' for '{}' ({}): {}",
                    raw, record.name, record.path_key, e
                );
                self.report.unparsable += 1;
                return;
            }
        };

        match self.keys.entry(normalize(&record.path_key)) {
            Entry::Vacant(slot) => {
                slot.insert(key);
                self.report.indexed += 1;
            }
            Entry::Occupied(_) => {
                warn!(
                    "Duplicate identifier '{}' (from '{}'), keeping first key",
                    record.path_key, record.name
                );
                self.report.duplicates += 1;
            }
        }
    }

    pub fn build(self) -> (KeyIndex, KeyIndexReport) {
        let report = self.report;
        info!(
            "Key index built: {} keys from {} records ({} duplicates, {} without key, {} unparsable)",
            report.indexed, report.records, report.duplicates, report.missing_key, report.unparsable
        );
        (KeyIndex { keys: self.keys }, report)
    }
}

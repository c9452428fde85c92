use serde::Serialize;

/// One asset entry of the metadata catalog (table `a`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataRecord {
    /// Asset type (column `m`).
    pub kind: String,
    /// Logical asset name (column `n`); the record's natural identity.
    pub name: String,
    /// On-disk file identifier (column `h`).
    pub path_key: String,
    /// Column `c`.
    pub checksum: Option<String>,
    /// Column `d`.
    pub dependencies: String,
    /// Decimal decryption key text (column `e`).
    pub key: Option<String>,
}

impl std::fmt::Display for MetadataRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} -> {}", self.kind, self.name, self.path_key)
    }
}

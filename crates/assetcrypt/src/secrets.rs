//! Database key handling.
//!
//! The catalog key is supplied as a hex string on the command line or in the
//! config file. When none is given, [`DatabaseKey::default_key`] supplies the
//! documented default. Key bytes stay wrapped in a `SecretSlice` so they never
//! reach log output through `Debug`.

use secrecy::{ExposeSecret, SecretSlice};

use crate::error::KeyResolutionError;

/// Default 32-byte catalog key used when no key is configured.
pub const DEFAULT_DATABASE_KEY: [u8; 32] = [
    0x9C, 0x2B, 0xAB, 0x97, 0xBC, 0xF8, 0xC0, 0xC4, 0xF1, 0xA9, 0xEA, 0x78, 0x81, 0xA2, 0x13, 0xF6,
    0xC9, 0xEB, 0xF9, 0xD8, 0xD4, 0xC6, 0xA8, 0xE4, 0x3C, 0xE5, 0xA2, 0x59, 0xBD, 0xE7, 0xE9, 0xFD,
];

/// Raw key bytes for the cipher-extended catalog store.
pub struct DatabaseKey {
    bytes: SecretSlice<u8>,
}

impl DatabaseKey {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes: SecretSlice::from(bytes),
        }
    }

    pub fn default_key() -> Self {
        Self::from_bytes(DEFAULT_DATABASE_KEY.to_vec())
    }

    /// Parses a hex key. `0x` prefixes, spaces and hyphens are stripped
    /// before decoding; the remainder must be non-empty and even-length.
    pub fn parse_hex(input: &str) -> Result<Self, KeyResolutionError> {
        let cleaned = input.replace("0x", "").replace([' ', '-'], "");

        if cleaned.is_empty() {
            return Err(KeyResolutionError::MalformedHexKey {
                reason: "key is empty".to_string(),
            });
        }

        if cleaned.len() % 2 != 0 {
            return Err(KeyResolutionError::MalformedHexKey {
                reason: format!("hex key length must be even, got {}", cleaned.len()),
            });
        }

        let bytes = hex::decode(&cleaned).map_err(|e| KeyResolutionError::MalformedHexKey {
            reason: e.to_string(),
        })?;

        Ok(Self::from_bytes(bytes))
    }

    /// Uses `hex` when given, otherwise the default key.
    pub fn resolve(hex: Option<&str>) -> Result<Self, KeyResolutionError> {
        match hex {
            Some(value) if !value.trim().is_empty() => {
                log::info!("Using custom database key");
                Self::parse_hex(value)
            }
            _ => {
                log::info!("Using default database key");
                Ok(Self::default_key())
            }
        }
    }

    pub fn expose(&self) -> &[u8] {
        self.bytes.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.expose().len()
    }

    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }
}

impl std::fmt::Debug for DatabaseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DatabaseKey([REDACTED; {} bytes])", self.len())
    }
}

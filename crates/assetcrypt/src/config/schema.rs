use serde::{Deserialize, Serialize};

use crate::cipher::{XorBlockCipher, DEFAULT_BASE_KEY, DEFAULT_HEADER_LEN};
use crate::error::ConfigError;

/// Run configuration. Every field is optional in the JSON file; command line
/// flags override the loaded values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Catalog key as hex. The built-in default key is used when absent.
    #[serde(default, skip_serializing)]
    pub database_key: Option<String>,
    #[serde(default = "default_cipher_id")]
    pub cipher_id: u32,
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
    #[serde(default = "default_true")]
    pub skip_existing: bool,
    #[serde(default)]
    pub cipher: CipherConfig,
}

fn default_cipher_id() -> u32 {
    3
}

fn default_progress_interval_ms() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_key: None,
            cipher_id: default_cipher_id(),
            max_concurrency: None,
            progress_interval_ms: default_progress_interval_ms(),
            skip_existing: true,
            cipher: CipherConfig::default(),
        }
    }
}

/// Parameters of the bundled block cipher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CipherConfig {
    #[serde(default = "default_header_len")]
    pub header_len: usize,
    #[serde(default = "default_base_key")]
    pub base_key: String,
}

fn default_header_len() -> usize {
    DEFAULT_HEADER_LEN
}

fn default_base_key() -> String {
    hex::encode_upper(DEFAULT_BASE_KEY)
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self {
            header_len: default_header_len(),
            base_key: default_base_key(),
        }
    }
}

impl CipherConfig {
    pub fn base_key_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        let bytes = hex::decode(self.base_key.trim()).map_err(|e| ConfigError::Validation {
            message: format!("Invalid cipher base_key: {}", e),
        })?;
        if bytes.is_empty() {
            return Err(ConfigError::Validation {
                message: "cipher base_key must not be empty".to_string(),
            });
        }
        Ok(bytes)
    }

    pub fn build(&self) -> Result<XorBlockCipher, ConfigError> {
        Ok(XorBlockCipher::new(self.base_key_bytes()?, self.header_len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cipher_id, 3);
        assert_eq!(config.progress_interval_ms, 2000);
        assert!(config.skip_existing);
        assert!(config.database_key.is_none());
        assert_eq!(config.cipher.base_key_bytes().unwrap(), DEFAULT_BASE_KEY.to_vec());
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.cipher_id, 3);
        assert_eq!(config.cipher.header_len, DEFAULT_HEADER_LEN);
    }

    #[test]
    fn test_database_key_is_not_serialized() {
        let config = Config {
            database_key: Some("DEADBEEF".to_string()),
            ..Config::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("DEADBEEF"));
    }

    #[test]
    fn test_invalid_base_key() {
        let cipher = CipherConfig {
            header_len: 0,
            base_key: "XYZ".to_string(),
        };
        assert!(cipher.build().is_err());
    }
}

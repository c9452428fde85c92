use std::path::Path;

use crate::config::schema::Config;
use crate::db::sqlite::cipher_name;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if cipher_name(config.cipher_id).is_none() {
        return Err(ConfigError::Validation {
            message: format!("cipher_id must be between 1 and 6, got {}", config.cipher_id),
        });
    }

    if config.progress_interval_ms == 0 {
        return Err(ConfigError::Validation {
            message: "progress_interval_ms must be greater than 0".to_string(),
        });
    }

    if config.max_concurrency == Some(0) {
        return Err(ConfigError::Validation {
            message: "max_concurrency must be at least 1".to_string(),
        });
    }

    config.cipher.base_key_bytes()?;

    Ok(())
}

//! Per-file block decryption.
//!
//! The pipeline only depends on [`BlockCipher`]. [`XorBlockCipher`] is the
//! bundled implementation: a keyed XOR stream whose schedule is derived from a
//! configurable base key and the little-endian bytes of the 64-bit file key.
//! The first `header_len` bytes pass through untouched.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Default base key of the keyed XOR schedule.
pub const DEFAULT_BASE_KEY: [u8; 11] = [
    0x53, 0x2B, 0x46, 0x31, 0xE4, 0xA7, 0xB9, 0x47, 0x3E, 0x7C, 0xFB,
];

/// Bytes at the start of each file left in plaintext.
pub const DEFAULT_HEADER_LEN: usize = 256;

const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Error, Debug)]
pub enum DecryptionError {
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed input '{path}': {reason}")]
    Malformed { path: PathBuf, reason: String },
}

/// Decrypts one file into another with a numeric key.
///
/// The output is only valid when the call returns `Ok`.
pub trait BlockCipher: Send + Sync {
    fn decrypt_file(&self, input: &Path, output: &Path, key: i64) -> Result<(), DecryptionError>;
}

#[derive(Debug, Clone)]
pub struct XorBlockCipher {
    base_key: Vec<u8>,
    header_len: usize,
}

impl Default for XorBlockCipher {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_KEY.to_vec(), DEFAULT_HEADER_LEN)
    }
}

impl XorBlockCipher {
    /// # Panics
    /// Panics if `base_key` is empty.
    pub fn new(base_key: Vec<u8>, header_len: usize) -> Self {
        assert!(!base_key.is_empty(), "base_key must not be empty");
        Self {
            base_key,
            header_len,
        }
    }

    fn schedule(&self, key: i64) -> Vec<u8> {
        let key_bytes = key.to_le_bytes();
        self.base_key
            .iter()
            .flat_map(|b| key_bytes.iter().map(move |k| b ^ k))
            .collect()
    }

    /// Applies the keystream to `data`, which starts at file offset `offset`.
    /// Applying it twice restores the input.
    pub fn apply(&self, data: &mut [u8], offset: usize, key: i64) {
        let schedule = self.schedule(key);
        self.apply_with(&schedule, data, offset);
    }

    fn apply_with(&self, schedule: &[u8], data: &mut [u8], offset: usize) {
        for (i, byte) in data.iter_mut().enumerate() {
            let position = offset + i;
            if position >= self.header_len {
                *byte ^= schedule[position % schedule.len()];
            }
        }
    }

    /// Streams `input` through the keystream into `output`.
    ///
    /// Writes to a sibling temporary file first and renames it into place,
    /// so a failed call never leaves a partial output behind.
    pub fn transform_file(&self, input: &Path, output: &Path, key: i64) -> Result<(), DecryptionError> {
        let source = File::open(input).map_err(|e| DecryptionError::Read {
            path: input.to_path_buf(),
            source: e,
        })?;
        let length = source
            .metadata()
            .map_err(|e| DecryptionError::Read {
                path: input.to_path_buf(),
                source: e,
            })?
            .len();
        if length == 0 {
            return Err(DecryptionError::Malformed {
                path: input.to_path_buf(),
                reason: "file is empty".to_string(),
            });
        }

        let partial = partial_path(output);
        let result = self.stream(source, input, &partial, key);
        if let Err(e) = result {
            let _ = std::fs::remove_file(&partial);
            return Err(e);
        }

        std::fs::rename(&partial, output).map_err(|e| {
            let _ = std::fs::remove_file(&partial);
            DecryptionError::Write {
                path: output.to_path_buf(),
                source: e,
            }
        })
    }

    fn stream(&self, source: File, input: &Path, partial: &Path, key: i64) -> Result<(), DecryptionError> {
        let schedule = self.schedule(key);
        let mut reader = BufReader::new(source);
        let target = File::create(partial).map_err(|e| DecryptionError::Write {
            path: partial.to_path_buf(),
            source: e,
        })?;
        let mut writer = BufWriter::new(target);

        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut offset = 0usize;
        loop {
            let read = reader.read(&mut buffer).map_err(|e| DecryptionError::Read {
                path: input.to_path_buf(),
                source: e,
            })?;
            if read == 0 {
                break;
            }
            self.apply_with(&schedule, &mut buffer[..read], offset);
            writer
                .write_all(&buffer[..read])
                .map_err(|e| DecryptionError::Write {
                    path: partial.to_path_buf(),
                    source: e,
                })?;
            offset += read;
        }

        writer.flush().map_err(|e| DecryptionError::Write {
            path: partial.to_path_buf(),
            source: e,
        })
    }
}

impl BlockCipher for XorBlockCipher {
    fn decrypt_file(&self, input: &Path, output: &Path, key: i64) -> Result<(), DecryptionError> {
        self.transform_file(input, output, key)
    }
}

fn partial_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    output.with_file_name(format!(".{}.part", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[test]
    fn test_apply_round_trip() {
        let cipher = XorBlockCipher::default();
        let original = sample(5000);
        let mut data = original.clone();

        cipher.apply(&mut data, 0, 1_234_567_890_123);
        assert_ne!(data, original);
        cipher.apply(&mut data, 0, 1_234_567_890_123);
        assert_eq!(data, original);
    }

    #[test]
    fn test_header_passes_through() {
        let cipher = XorBlockCipher::default();
        let original = sample(1000);
        let mut data = original.clone();

        cipher.apply(&mut data, 0, -42);
        assert_eq!(&data[..DEFAULT_HEADER_LEN], &original[..DEFAULT_HEADER_LEN]);
        assert_ne!(&data[DEFAULT_HEADER_LEN..], &original[DEFAULT_HEADER_LEN..]);
    }

    #[test]
    fn test_chunk_offsets_match_whole_buffer() {
        let cipher = XorBlockCipher::new(vec![1, 2, 3], 4);
        let original = sample(100);

        let mut whole = original.clone();
        cipher.apply(&mut whole, 0, 99);

        let mut split = original.clone();
        let (a, b) = split.split_at_mut(37);
        cipher.apply(a, 0, 99);
        cipher.apply(b, 37, 99);

        assert_eq!(whole, split);
    }

    #[test]
    fn test_wrong_key_does_not_restore() {
        let cipher = XorBlockCipher::default();
        let original = sample(2000);
        let mut data = original.clone();

        cipher.apply(&mut data, 0, 1001);
        cipher.apply(&mut data, 0, 2002);
        assert_ne!(data, original);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain.bin");
        let encrypted = dir.path().join("enc.bin");
        let decrypted = dir.path().join("dec.bin");
        let original = sample(CHUNK_SIZE * 2 + 123);
        std::fs::write(&plain, &original).unwrap();

        let cipher = XorBlockCipher::default();
        cipher.transform_file(&plain, &encrypted, 77).unwrap();
        cipher.decrypt_file(&encrypted, &decrypted, 77).unwrap();

        assert_eq!(std::fs::read(&decrypted).unwrap(), original);
        assert!(!partial_path(&decrypted).exists());
    }

    #[test]
    fn test_empty_input_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("empty.bin");
        let output = dir.path().join("out.bin");
        std::fs::write(&input, b"").unwrap();

        let result = XorBlockCipher::default().decrypt_file(&input, &output, 1);
        assert!(matches!(result, Err(DecryptionError::Malformed { .. })));
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_input_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.bin");

        let result =
            XorBlockCipher::default().decrypt_file(&dir.path().join("nope"), &output, 1);
        assert!(matches!(result, Err(DecryptionError::Read { .. })));
        assert!(!output.exists());
    }
}

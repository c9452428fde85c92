//! Test harness for isolated pipeline and mirror runs.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use assetcrypt::pipeline::NoopProgress;
use assetcrypt::{Config, Orchestrator, XorBlockCipher};

/// Deterministic payload of `len` bytes seeded by `seed`.
pub fn payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

pub struct TestHarness {
    temp_dir: TempDir,
    /// Root of the input tree (`meta`, `master/`, `dat/` for mirror runs).
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub cipher: XorBlockCipher,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let input_dir = temp_dir.path().join("input");
        let output_dir = temp_dir.path().join("output");
        std::fs::create_dir_all(&input_dir).expect("Failed to create input directory");

        Self {
            temp_dir,
            input_dir,
            output_dir,
            cipher: XorBlockCipher::default(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Encrypts `content` with `key` into `input_dir/relative`.
    pub fn write_encrypted(&self, relative: &str, content: &[u8], key: i64) -> PathBuf {
        let target = self.input_dir.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent");
        }
        let staging = self.root().join("staging.plain");
        std::fs::write(&staging, content).expect("Failed to write plaintext");
        self.cipher
            .transform_file(&staging, &target, key)
            .expect("Failed to encrypt fixture");
        std::fs::remove_file(&staging).expect("Failed to remove plaintext");
        target
    }

    pub fn write_plain(&self, relative: &str, content: &[u8]) -> PathBuf {
        let target = self.input_dir.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent");
        }
        std::fs::write(&target, content).expect("Failed to write file");
        target
    }

    pub fn read_output(&self, relative: &str) -> Vec<u8> {
        std::fs::read(self.output_dir.join(relative)).expect("Failed to read output")
    }

    pub fn output_exists(&self, relative: &str) -> bool {
        self.output_dir.join(relative).exists()
    }

    /// An orchestrator with quiet progress and the harness cipher.
    pub fn orchestrator(&self, config: Config) -> Orchestrator {
        Orchestrator::new(config)
            .expect("Failed to build orchestrator")
            .with_cipher(Arc::new(self.cipher.clone()))
            .with_reporter(Arc::new(NoopProgress))
    }
}

//! Shared test utilities for assetcrypt integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs with temp input/output directories
//! - `CatalogBuilder` for writing metadata catalog fixtures
//! - `LockedStore`, a cipher store that only answers once keyed

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{payload, TestHarness};

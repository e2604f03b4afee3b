//! Test utilities for storage tests.
//!
//! Provides a RAII test environment whose temporary data directory is
//! removed when the environment drops, even if the test panics.

use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;

use super::connection::JsonConnection;

pub struct TestEnvironment {
    pub connection: Arc<JsonConnection>,
    /// Base directory path for manual inspection if needed.
    pub base_path: std::path::PathBuf,
    _temp_dir: TempDir, // Keep alive to prevent cleanup
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let connection = Arc::new(JsonConnection::new(temp_dir.path())?);
        Ok(Self {
            connection,
            base_path: temp_dir.path().to_path_buf(),
            _temp_dir: temp_dir,
        })
    }
}

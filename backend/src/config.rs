//! Application configuration.
//!
//! Everything the core needs from its environment arrives through this
//! object at construction time. There are no ambient key-value lookups:
//! tests inject a fake config and a fake remote instead of mutating
//! process-global state.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level configuration for the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the five collection files.
    pub data_dir: PathBuf,
    /// Optional single-file backup from earlier app builds, used as a
    /// fallback when the record store cannot be read at startup.
    #[serde(default)]
    pub legacy_backup: Option<PathBuf>,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Settings for the cloud sync engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Bearer token for the remote blob store. Sync is a no-op until this
    /// is present (the feature is opt-in).
    pub access_token: Option<String>,
    /// REST endpoint for file metadata operations.
    pub api_base_url: String,
    /// REST endpoint for file content uploads.
    pub upload_base_url: String,
    /// Name of the snapshot file in the remote store.
    pub snapshot_file_name: String,
    /// Quiet period after the last local change before uploading.
    pub debounce_ms: u64,
    /// Bounded wait for the initial record-store load.
    pub startup_load_timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            api_base_url: "https://www.googleapis.com/drive/v3".to_string(),
            upload_base_url: "https://www.googleapis.com/upload/drive/v3".to_string(),
            snapshot_file_name: "database.json".to_string(),
            debounce_ms: 5000,
            startup_load_timeout_ms: 3000,
        }
    }
}

impl AppConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            legacy_backup: None,
            sync: SyncConfig::default(),
        }
    }

    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_yaml::to_string(self).context("Failed to serialize config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }
}

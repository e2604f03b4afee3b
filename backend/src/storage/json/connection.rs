//! JSON-file storage connection.
//!
//! Each collection lives in its own JSON file under the data directory.
//! Single-collection writes go through a temp-file-then-rename so a crash
//! never leaves a half-written file behind, and the five-collection
//! replace used by sync stages every file before committing any of them.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::state::AppData;

pub(crate) const LOGS_FILE: &str = "logs.json";
pub(crate) const CHILDREN_FILE: &str = "children.json";
pub(crate) const APPOINTMENTS_FILE: &str = "appointments.json";
pub(crate) const CAREGIVERS_FILE: &str = "caregivers.json";
pub(crate) const JOIN_REQUESTS_FILE: &str = "join_requests.json";

/// Connection to a JSON-file data directory.
#[derive(Debug, Clone)]
pub struct JsonConnection {
    base_directory: PathBuf,
}

impl JsonConnection {
    /// Open (creating if needed) the data directory.
    pub fn new(base_directory: impl Into<PathBuf>) -> Result<Self> {
        let base_directory = base_directory.into();
        fs::create_dir_all(&base_directory).with_context(|| {
            format!("Failed to create data directory: {}", base_directory.display())
        })?;
        info!("Opened record store at {}", base_directory.display());
        Ok(Self { base_directory })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    fn collection_path(&self, file_name: &str) -> PathBuf {
        self.base_directory.join(file_name)
    }

    /// Read a whole collection. A missing file is an empty collection, not
    /// an error, so a fresh data directory just works.
    pub(crate) fn read_collection<T: DeserializeOwned>(&self, file_name: &str) -> Result<Vec<T>> {
        let path = self.collection_path(file_name);
        if !path.exists() {
            debug!("Collection file {} does not exist yet", file_name);
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read collection file: {}", path.display()))?;
        let items: Vec<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse collection file: {}", path.display()))?;
        Ok(items)
    }

    /// Overwrite a whole collection atomically (temp file + rename).
    pub(crate) fn write_collection<T: Serialize>(&self, file_name: &str, items: &[T]) -> Result<()> {
        let path = self.collection_path(file_name);
        let contents = serde_json::to_string_pretty(items)
            .with_context(|| format!("Failed to serialize collection: {}", file_name))?;

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, contents)
            .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;
        fs::rename(&temp_path, &path)
            .with_context(|| format!("Failed to replace collection file: {}", path.display()))?;
        Ok(())
    }

    /// Atomically replace all five collections with the given data.
    ///
    /// This is the transaction boundary of the pull-merge-persist cycle:
    /// every file is staged first, and nothing is committed unless every
    /// stage succeeded. A failure mid-stage leaves the store exactly as it
    /// was.
    pub fn replace_all(&self, data: &AppData) -> Result<()> {
        let staged = match self.stage_all(data) {
            Ok(staged) => staged,
            Err(e) => {
                self.discard_staged();
                return Err(e);
            }
        };

        for (staged_path, final_path) in staged {
            fs::rename(&staged_path, &final_path).with_context(|| {
                format!("Failed to commit staged collection: {}", final_path.display())
            })?;
        }
        debug!("Replaced all collections in {}", self.base_directory.display());
        Ok(())
    }

    fn stage_all(&self, data: &AppData) -> Result<[(PathBuf, PathBuf); 5]> {
        Ok([
            self.stage(LOGS_FILE, &data.logs)?,
            self.stage(CHILDREN_FILE, &data.children)?,
            self.stage(APPOINTMENTS_FILE, &data.appointments)?,
            self.stage(CAREGIVERS_FILE, &data.caregivers)?,
            self.stage(JOIN_REQUESTS_FILE, &data.join_requests)?,
        ])
    }

    /// Best-effort removal of leftover staged files after an aborted
    /// transaction.
    fn discard_staged(&self) {
        for file_name in
            [LOGS_FILE, CHILDREN_FILE, APPOINTMENTS_FILE, CAREGIVERS_FILE, JOIN_REQUESTS_FILE]
        {
            let staged_path = self.collection_path(file_name).with_extension("staged");
            let _ = fs::remove_file(staged_path);
        }
    }

    fn stage<T: Serialize>(&self, file_name: &str, items: &[T]) -> Result<(PathBuf, PathBuf)> {
        let final_path = self.collection_path(file_name);
        let staged_path = final_path.with_extension("staged");
        let contents = serde_json::to_string_pretty(items)
            .with_context(|| format!("Failed to serialize collection: {}", file_name))?;
        fs::write(&staged_path, contents)
            .with_context(|| format!("Failed to stage collection file: {}", staged_path.display()))?;
        Ok((staged_path, final_path))
    }

    /// Read all five collections in one pass.
    pub fn load_all(&self) -> Result<AppData> {
        Ok(AppData {
            logs: self.read_collection(LOGS_FILE)?,
            children: self.read_collection(CHILDREN_FILE)?,
            appointments: self.read_collection(APPOINTMENTS_FILE)?,
            caregivers: self.read_collection(CAREGIVERS_FILE)?,
            join_requests: self.read_collection(JOIN_REQUESTS_FILE)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{ActivityKind, ActivityLog};
    use tempfile::tempdir;

    fn sample_log(id: &str) -> ActivityLog {
        ActivityLog {
            id: id.to_string(),
            child_id: "c1".to_string(),
            kind: ActivityKind::Diaper,
            timestamp: 100,
            details: String::new(),
            value: None,
            sub_type: None,
            notes: None,
            image_url: None,
            updated_at: 100,
        }
    }

    #[test]
    fn missing_collection_reads_as_empty() {
        let dir = tempdir().unwrap();
        let conn = JsonConnection::new(dir.path()).unwrap();
        let logs: Vec<ActivityLog> = conn.read_collection(LOGS_FILE).unwrap();
        assert!(logs.is_empty());
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let conn = JsonConnection::new(dir.path()).unwrap();

        conn.write_collection(LOGS_FILE, &[sample_log("l1"), sample_log("l2")]).unwrap();
        let logs: Vec<ActivityLog> = conn.read_collection(LOGS_FILE).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].id, "l1");
    }

    #[test]
    fn replace_all_swaps_every_collection() {
        let dir = tempdir().unwrap();
        let conn = JsonConnection::new(dir.path()).unwrap();
        conn.write_collection(LOGS_FILE, &[sample_log("old")]).unwrap();

        let mut data = AppData::default();
        data.logs.push(sample_log("new"));
        conn.replace_all(&data).unwrap();

        let logs: Vec<ActivityLog> = conn.read_collection(LOGS_FILE).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].id, "new");
        // The other collections were rewritten as empty, not left missing.
        assert!(dir.path().join(CHILDREN_FILE).exists());
    }

    #[test]
    fn failed_staging_leaves_existing_collections_untouched() {
        let dir = tempdir().unwrap();
        let conn = JsonConnection::new(dir.path()).unwrap();
        conn.write_collection(LOGS_FILE, &[sample_log("survivor")]).unwrap();

        // Block the staging path of the children collection with a
        // directory so fs::write fails partway through the transaction.
        fs::create_dir(dir.path().join("children.staged")).unwrap();

        let mut data = AppData::default();
        data.logs.push(sample_log("replacement"));
        assert!(conn.replace_all(&data).is_err());

        // Nothing was committed: the pre-transaction state is intact.
        let logs: Vec<ActivityLog> = conn.read_collection(LOGS_FILE).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].id, "survivor");

        // And the aborted transaction cleaned up after itself: the file
        // staged before the failure is gone (only the blocking directory
        // remains).
        assert!(!dir.path().join("logs.staged").exists());
        assert!(dir.path().join("children.staged").is_dir());
    }
}

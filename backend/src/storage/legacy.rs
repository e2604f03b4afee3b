//! Legacy backup loader.
//!
//! Earlier app builds kept everything in a single JSON blob. When the
//! record store cannot be read at startup (or times out), this loader is
//! the fallback so the app still comes up with whatever data it can get.
//! Each section is parsed independently and defensively: a corrupt section
//! degrades to empty instead of poisoning the whole load.

use std::path::Path;

use log::{info, warn};
use serde::de::DeserializeOwned;

use crate::state::AppData;

/// Read the legacy single-file backup. Never fails: anything unreadable
/// becomes the empty default.
pub fn load_legacy_backup(path: &Path) -> AppData {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!("Legacy backup {} unreadable: {}", path.display(), e);
            return AppData::default();
        }
    };

    let value: serde_json::Value = match serde_json::from_str(&contents) {
        Ok(value) => value,
        Err(e) => {
            warn!("Legacy backup {} is not valid JSON: {}", path.display(), e);
            return AppData::default();
        }
    };

    let data = AppData {
        logs: safe_section(&value, "logs"),
        children: safe_section(&value, "children"),
        appointments: safe_section(&value, "appointments"),
        caregivers: safe_section(&value, "caregivers"),
        join_requests: safe_section(&value, "joinRequests"),
    };
    info!(
        "Loaded legacy backup: {} children, {} logs",
        data.children.len(),
        data.logs.len()
    );
    data
}

fn safe_section<T: DeserializeOwned>(value: &serde_json::Value, key: &str) -> Vec<T> {
    match value.get(key) {
        Some(section) => match serde_json::from_value(section.clone()) {
            Ok(items) => items,
            Err(e) => {
                warn!("Skipping unparseable legacy section {:?}: {}", key, e);
                Vec::new()
            }
        },
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_backup_loads_what_it_can() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("backup.json");
        // children parse; logs are garbage; other sections absent.
        std::fs::write(
            &path,
            r#"{
                "children": [{"id":"c1","name":"Leo","dob":"2023-09-15","gender":"boy","updatedAt":1}],
                "logs": {"not":"an array"}
            }"#,
        )
        .unwrap();

        let data = load_legacy_backup(&path);
        assert_eq!(data.children.len(), 1);
        assert_eq!(data.children[0].name, "Leo");
        assert!(data.logs.is_empty());
        assert!(data.appointments.is_empty());
    }

    #[test]
    fn missing_file_yields_empty_data() {
        let data = load_legacy_backup(Path::new("/nonexistent/backup.json"));
        assert!(data.is_empty());
    }
}

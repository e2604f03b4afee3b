use std::sync::Arc;

use anyhow::Result;
use log::debug;
use shared::ActivityLog;

use super::connection::{JsonConnection, LOGS_FILE};
use crate::storage::traits::ActivityLogStorage;

/// JSON-file backed activity log repository.
#[derive(Debug, Clone)]
pub struct LogRepository {
    connection: Arc<JsonConnection>,
}

impl LogRepository {
    pub fn new(connection: Arc<JsonConnection>) -> Self {
        Self { connection }
    }
}

impl ActivityLogStorage for LogRepository {
    fn list_logs(&self) -> Result<Vec<ActivityLog>> {
        self.connection.read_collection(LOGS_FILE)
    }

    fn store_log(&self, log: &ActivityLog) -> Result<()> {
        let mut logs = self.list_logs()?;
        logs.push(log.clone());
        self.connection.write_collection(LOGS_FILE, &logs)
    }

    fn update_log(&self, log: &ActivityLog) -> Result<()> {
        let mut logs = self.list_logs()?;
        match logs.iter_mut().find(|l| l.id == log.id) {
            Some(existing) => *existing = log.clone(),
            None => anyhow::bail!("Log not found: {}", log.id),
        }
        self.connection.write_collection(LOGS_FILE, &logs)
    }

    fn delete_log(&self, log_id: &str) -> Result<bool> {
        let mut logs = self.list_logs()?;
        let before = logs.len();
        logs.retain(|l| l.id != log_id);
        if logs.len() == before {
            return Ok(false);
        }
        self.connection.write_collection(LOGS_FILE, &logs)?;
        Ok(true)
    }

    fn delete_logs_for_child(&self, child_id: &str) -> Result<u32> {
        let mut logs = self.list_logs()?;
        let before = logs.len();
        logs.retain(|l| l.child_id != child_id);
        let removed = (before - logs.len()) as u32;
        if removed > 0 {
            self.connection.write_collection(LOGS_FILE, &logs)?;
            debug!("Deleted {} logs for child {}", removed, child_id);
        }
        Ok(removed)
    }

    fn bulk_insert_logs(&self, batch: &[ActivityLog]) -> Result<()> {
        let mut logs = self.list_logs()?;
        logs.extend_from_slice(batch);
        self.connection.write_collection(LOGS_FILE, &logs)
    }

    fn clear_logs(&self) -> Result<()> {
        self.connection.write_collection::<ActivityLog>(LOGS_FILE, &[])
    }
}

use std::sync::Arc;

use anyhow::Result;
use shared::JoinRequest;

use super::connection::{JsonConnection, JOIN_REQUESTS_FILE};
use crate::storage::traits::JoinRequestStorage;

/// JSON-file backed join request repository.
#[derive(Debug, Clone)]
pub struct JoinRequestRepository {
    connection: Arc<JsonConnection>,
}

impl JoinRequestRepository {
    pub fn new(connection: Arc<JsonConnection>) -> Self {
        Self { connection }
    }
}

impl JoinRequestStorage for JoinRequestRepository {
    fn list_join_requests(&self) -> Result<Vec<JoinRequest>> {
        self.connection.read_collection(JOIN_REQUESTS_FILE)
    }

    fn store_join_request(&self, request: &JoinRequest) -> Result<()> {
        let mut requests = self.list_join_requests()?;
        requests.push(request.clone());
        self.connection.write_collection(JOIN_REQUESTS_FILE, &requests)
    }

    fn delete_join_request(&self, request_id: &str) -> Result<bool> {
        let mut requests = self.list_join_requests()?;
        let before = requests.len();
        requests.retain(|r| r.id != request_id);
        if requests.len() == before {
            return Ok(false);
        }
        self.connection.write_collection(JOIN_REQUESTS_FILE, &requests)?;
        Ok(true)
    }

    fn bulk_insert_join_requests(&self, batch: &[JoinRequest]) -> Result<()> {
        let mut requests = self.list_join_requests()?;
        requests.extend_from_slice(batch);
        self.connection.write_collection(JOIN_REQUESTS_FILE, &requests)
    }

    fn clear_join_requests(&self) -> Result<()> {
        self.connection.write_collection::<JoinRequest>(JOIN_REQUESTS_FILE, &[])
    }
}

use std::sync::Arc;

use anyhow::Result;
use shared::Caregiver;

use super::connection::{JsonConnection, CAREGIVERS_FILE};
use crate::storage::traits::CaregiverStorage;

/// JSON-file backed caregiver repository.
#[derive(Debug, Clone)]
pub struct CaregiverRepository {
    connection: Arc<JsonConnection>,
}

impl CaregiverRepository {
    pub fn new(connection: Arc<JsonConnection>) -> Self {
        Self { connection }
    }
}

impl CaregiverStorage for CaregiverRepository {
    fn list_caregivers(&self) -> Result<Vec<Caregiver>> {
        self.connection.read_collection(CAREGIVERS_FILE)
    }

    fn store_caregiver(&self, caregiver: &Caregiver) -> Result<()> {
        let mut caregivers = self.list_caregivers()?;
        caregivers.push(caregiver.clone());
        self.connection.write_collection(CAREGIVERS_FILE, &caregivers)
    }

    fn update_caregiver(&self, caregiver: &Caregiver) -> Result<()> {
        let mut caregivers = self.list_caregivers()?;
        match caregivers.iter_mut().find(|c| c.id == caregiver.id) {
            Some(existing) => *existing = caregiver.clone(),
            None => anyhow::bail!("Caregiver not found: {}", caregiver.id),
        }
        self.connection.write_collection(CAREGIVERS_FILE, &caregivers)
    }

    fn delete_caregiver(&self, caregiver_id: &str) -> Result<bool> {
        let mut caregivers = self.list_caregivers()?;
        let before = caregivers.len();
        caregivers.retain(|c| c.id != caregiver_id);
        if caregivers.len() == before {
            return Ok(false);
        }
        self.connection.write_collection(CAREGIVERS_FILE, &caregivers)?;
        Ok(true)
    }

    fn bulk_insert_caregivers(&self, batch: &[Caregiver]) -> Result<()> {
        let mut caregivers = self.list_caregivers()?;
        caregivers.extend_from_slice(batch);
        self.connection.write_collection(CAREGIVERS_FILE, &caregivers)
    }

    fn clear_caregivers(&self) -> Result<()> {
        self.connection.write_collection::<Caregiver>(CAREGIVERS_FILE, &[])
    }
}

//! # Child Service
//!
//! Create, update and delete tracked children. Deleting a child cascades
//! to the child's logs and appointments so no orphaned records survive to
//! the next sync.

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use log::{info, warn};
use shared::{Child, Gender};
use uuid::Uuid;

use super::now_ms;
use crate::state::StateCache;
use crate::storage::traits::{ActivityLogStorage, AppointmentStorage, ChildStorage};
use crate::sync::ChangeSignal;

const MAX_NAME_LENGTH: usize = 100;

#[derive(Debug, Clone)]
pub struct CreateChildCommand {
    pub name: String,
    pub dob: String,
    pub photo_url: String,
    pub gender: Gender,
}

#[derive(Debug, Clone)]
pub struct UpdateChildCommand {
    pub id: String,
    pub name: String,
    pub dob: String,
    pub photo_url: String,
    pub gender: Gender,
}

pub struct ChildService {
    child_store: Arc<dyn ChildStorage>,
    log_store: Arc<dyn ActivityLogStorage>,
    appointment_store: Arc<dyn AppointmentStorage>,
    state: StateCache,
    changes: ChangeSignal,
}

impl ChildService {
    pub fn new(
        child_store: Arc<dyn ChildStorage>,
        log_store: Arc<dyn ActivityLogStorage>,
        appointment_store: Arc<dyn AppointmentStorage>,
        state: StateCache,
        changes: ChangeSignal,
    ) -> Self {
        Self { child_store, log_store, appointment_store, state, changes }
    }

    pub fn list_children(&self) -> Vec<Child> {
        self.state.read().expect("state cache poisoned").children.clone()
    }

    pub fn get_child(&self, child_id: &str) -> Option<Child> {
        let state = self.state.read().expect("state cache poisoned");
        state.children.iter().find(|c| c.id == child_id).cloned()
    }

    pub fn create_child(&self, command: CreateChildCommand) -> Result<Child> {
        let name = Self::validated_name(&command.name)?;
        Self::validated_dob(&command.dob)?;

        let child = Child {
            id: Uuid::new_v4().to_string(),
            name,
            dob: command.dob,
            photo_url: command.photo_url,
            gender: command.gender,
            updated_at: now_ms(),
            sleep_start_time: None,
        };

        self.child_store.store_child(&child)?;
        {
            let mut state = self.state.write().expect("state cache poisoned");
            state.children.push(child.clone());
        }
        self.changes.notify();
        info!("Created child {} ({})", child.name, child.id);
        Ok(child)
    }

    /// Edit a child's profile. The sleep timer marker is preserved so an
    /// in-progress session survives a profile edit.
    pub fn update_child(&self, command: UpdateChildCommand) -> Result<Child> {
        let name = Self::validated_name(&command.name)?;
        Self::validated_dob(&command.dob)?;

        let existing = self
            .child_store
            .get_child(&command.id)?
            .ok_or_else(|| anyhow::anyhow!("Child not found: {}", command.id))?;

        let child = Child {
            id: command.id,
            name,
            dob: command.dob,
            photo_url: command.photo_url,
            gender: command.gender,
            updated_at: now_ms(),
            sleep_start_time: existing.sleep_start_time,
        };

        self.child_store.update_child(&child)?;
        {
            let mut state = self.state.write().expect("state cache poisoned");
            if let Some(cached) = state.children.iter_mut().find(|c| c.id == child.id) {
                *cached = child.clone();
            }
        }
        self.changes.notify();
        Ok(child)
    }

    /// Delete a child along with every log and appointment that references
    /// it. Returns false when no such child exists.
    pub fn delete_child(&self, child_id: &str) -> Result<bool> {
        if !self.child_store.delete_child(child_id)? {
            warn!("Attempted to delete unknown child {}", child_id);
            return Ok(false);
        }
        let logs_removed = self.log_store.delete_logs_for_child(child_id)?;
        let appointments_removed = self.appointment_store.delete_appointments_for_child(child_id)?;

        {
            let mut state = self.state.write().expect("state cache poisoned");
            state.children.retain(|c| c.id != child_id);
            state.logs.retain(|l| l.child_id != child_id);
            state.appointments.retain(|a| a.child_id != child_id);
        }
        self.changes.notify();
        info!(
            "Deleted child {} with {} log(s) and {} appointment(s)",
            child_id, logs_removed, appointments_removed
        );
        Ok(true)
    }

    fn validated_name(raw: &str) -> Result<String> {
        let name = raw.trim();
        if name.is_empty() {
            anyhow::bail!("Child name cannot be empty");
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            anyhow::bail!("Child name cannot exceed {} characters", MAX_NAME_LENGTH);
        }
        Ok(name.to_string())
    }

    fn validated_dob(dob: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(dob, "%Y-%m-%d")
            .map_err(|_| anyhow::anyhow!("Birth date must be a valid YYYY-MM-DD date: {}", dob))
    }
}

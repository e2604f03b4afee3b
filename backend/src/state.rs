//! In-memory application state shared between the mutation services and the
//! sync engine.
//!
//! Every local mutation updates this cache synchronously alongside the
//! record store, so the presentation layer never blocks on storage or
//! network, and the debounced upload serializes a quiescent snapshot of it.

use std::sync::{Arc, RwLock};

use shared::{ActivityLog, Caregiver, Child, JoinRequest, Snapshot, VaccineAppointment};

/// The five record collections held in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppData {
    pub logs: Vec<ActivityLog>,
    pub children: Vec<Child>,
    pub appointments: Vec<VaccineAppointment>,
    pub caregivers: Vec<Caregiver>,
    pub join_requests: Vec<JoinRequest>,
}

impl AppData {
    /// Package the current collections as a cloud snapshot.
    pub fn to_snapshot(&self, last_sync: i64) -> Snapshot {
        Snapshot {
            logs: self.logs.clone(),
            children: self.children.clone(),
            appointments: self.appointments.clone(),
            caregivers: self.caregivers.clone(),
            join_requests: self.join_requests.clone(),
            last_sync,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
            && self.children.is_empty()
            && self.appointments.is_empty()
            && self.caregivers.is_empty()
            && self.join_requests.is_empty()
    }
}

/// Shared handle to the in-memory state.
pub type StateCache = Arc<RwLock<AppData>>;

pub fn new_state_cache() -> StateCache {
    Arc::new(RwLock::new(AppData::default()))
}

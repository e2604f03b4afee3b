//! # Storage Traits
//!
//! Storage abstraction for the five record collections. The domain layer
//! and the sync engine work against these traits, so the backing store
//! (JSON files today, a database tomorrow) can change without touching
//! merge or mutation logic.

use anyhow::Result;
use shared::{ActivityLog, Caregiver, Child, JoinRequest, VaccineAppointment};

/// Storage operations for activity logs.
pub trait ActivityLogStorage: Send + Sync {
    /// List every log in the store.
    fn list_logs(&self) -> Result<Vec<ActivityLog>>;

    /// Store a new log.
    fn store_log(&self, log: &ActivityLog) -> Result<()>;

    /// Replace an existing log wholesale, matched by id.
    fn update_log(&self, log: &ActivityLog) -> Result<()>;

    /// Delete a log by id. Returns true if a log was removed.
    fn delete_log(&self, log_id: &str) -> Result<bool>;

    /// Delete every log belonging to a child. Returns the number removed.
    fn delete_logs_for_child(&self, child_id: &str) -> Result<u32>;

    /// Append a batch of logs without touching existing ones.
    fn bulk_insert_logs(&self, logs: &[ActivityLog]) -> Result<()>;

    /// Remove every log.
    fn clear_logs(&self) -> Result<()>;
}

/// Storage operations for children.
pub trait ChildStorage: Send + Sync {
    fn list_children(&self) -> Result<Vec<Child>>;

    fn get_child(&self, child_id: &str) -> Result<Option<Child>>;

    fn store_child(&self, child: &Child) -> Result<()>;

    /// Replace an existing child wholesale, matched by id.
    fn update_child(&self, child: &Child) -> Result<()>;

    /// Delete a child by id. Returns true if a child was removed.
    /// Cascading deletes of the child's logs and appointments are the
    /// domain layer's responsibility.
    fn delete_child(&self, child_id: &str) -> Result<bool>;

    fn bulk_insert_children(&self, children: &[Child]) -> Result<()>;

    fn clear_children(&self) -> Result<()>;
}

/// Storage operations for vaccine appointments.
///
/// Appointments are identified by the composite `(child_id, vaccine_name)`
/// key rather than an id column.
pub trait AppointmentStorage: Send + Sync {
    fn list_appointments(&self) -> Result<Vec<VaccineAppointment>>;

    /// Insert or replace the appointment with the same composite key.
    fn put_appointment(&self, appointment: &VaccineAppointment) -> Result<()>;

    /// Delete by composite key. Returns true if an appointment was removed.
    fn delete_appointment(&self, child_id: &str, vaccine_name: &str) -> Result<bool>;

    /// Delete every appointment belonging to a child. Returns the number
    /// removed.
    fn delete_appointments_for_child(&self, child_id: &str) -> Result<u32>;

    /// Overwrite the whole collection.
    fn replace_appointments(&self, appointments: &[VaccineAppointment]) -> Result<()>;

    fn bulk_insert_appointments(&self, appointments: &[VaccineAppointment]) -> Result<()>;

    fn clear_appointments(&self) -> Result<()>;
}

/// Storage operations for caregivers.
pub trait CaregiverStorage: Send + Sync {
    fn list_caregivers(&self) -> Result<Vec<Caregiver>>;

    fn store_caregiver(&self, caregiver: &Caregiver) -> Result<()>;

    fn update_caregiver(&self, caregiver: &Caregiver) -> Result<()>;

    fn delete_caregiver(&self, caregiver_id: &str) -> Result<bool>;

    fn bulk_insert_caregivers(&self, caregivers: &[Caregiver]) -> Result<()>;

    fn clear_caregivers(&self) -> Result<()>;
}

/// Storage operations for join requests.
pub trait JoinRequestStorage: Send + Sync {
    fn list_join_requests(&self) -> Result<Vec<JoinRequest>>;

    fn store_join_request(&self, request: &JoinRequest) -> Result<()>;

    fn delete_join_request(&self, request_id: &str) -> Result<bool>;

    fn bulk_insert_join_requests(&self, requests: &[JoinRequest]) -> Result<()>;

    fn clear_join_requests(&self) -> Result<()>;
}

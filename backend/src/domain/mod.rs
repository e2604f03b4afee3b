//! Domain services: the mutation surface of the tracker.
//!
//! Every service follows the same shape: validate, write through the
//! storage trait, mirror the change into the in-memory state cache, then
//! fire the change signal so the sync engine schedules an upload.

pub mod activity_service;
pub mod appointment_service;
pub mod child_service;
pub mod family_service;
pub mod invariants;

pub use activity_service::{ActivityService, LogActivityCommand, LogActivityOutcome};
pub use appointment_service::AppointmentService;
pub use child_service::{ChildService, CreateChildCommand, UpdateChildCommand};
pub use family_service::{AddCaregiverCommand, FamilyService, SubmitJoinRequestCommand};

/// Current time in epoch milliseconds, the unit every record timestamp uses.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

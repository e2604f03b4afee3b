//! Cross-collection rules that must hold after any mutation or merge.

use shared::{ActivityKind, ActivityLog, VaccineAppointment};

/// Drop every appointment whose vaccine has already been administered.
///
/// A vaccine log for a child completes the appointment carrying the same
/// vaccine name, regardless of whether the log was created locally or
/// arrived through a sync merge. Comparison is exact on the vaccine name.
pub fn clear_completed_vaccines(
    logs: &[ActivityLog],
    appointments: Vec<VaccineAppointment>,
) -> Vec<VaccineAppointment> {
    appointments
        .into_iter()
        .filter(|appt| {
            !logs.iter().any(|log| {
                log.kind == ActivityKind::Vaccine
                    && log.child_id == appt.child_id
                    && log.details == appt.vaccine_name
            })
        })
        .collect()
}

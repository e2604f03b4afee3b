use std::sync::Arc;

use anyhow::Result;
use shared::VaccineAppointment;

use super::connection::{JsonConnection, APPOINTMENTS_FILE};
use crate::storage::traits::AppointmentStorage;

/// JSON-file backed vaccine appointment repository.
///
/// Identity here is the `(child_id, vaccine_name)` composite key, so
/// `put_appointment` is an upsert and deletes match on both fields.
#[derive(Debug, Clone)]
pub struct AppointmentRepository {
    connection: Arc<JsonConnection>,
}

impl AppointmentRepository {
    pub fn new(connection: Arc<JsonConnection>) -> Self {
        Self { connection }
    }
}

impl AppointmentStorage for AppointmentRepository {
    fn list_appointments(&self) -> Result<Vec<VaccineAppointment>> {
        self.connection.read_collection(APPOINTMENTS_FILE)
    }

    fn put_appointment(&self, appointment: &VaccineAppointment) -> Result<()> {
        let mut appointments = self.list_appointments()?;
        appointments.retain(|a| {
            !(a.child_id == appointment.child_id && a.vaccine_name == appointment.vaccine_name)
        });
        appointments.push(appointment.clone());
        self.connection.write_collection(APPOINTMENTS_FILE, &appointments)
    }

    fn delete_appointment(&self, child_id: &str, vaccine_name: &str) -> Result<bool> {
        let mut appointments = self.list_appointments()?;
        let before = appointments.len();
        appointments.retain(|a| !(a.child_id == child_id && a.vaccine_name == vaccine_name));
        if appointments.len() == before {
            return Ok(false);
        }
        self.connection.write_collection(APPOINTMENTS_FILE, &appointments)?;
        Ok(true)
    }

    fn delete_appointments_for_child(&self, child_id: &str) -> Result<u32> {
        let mut appointments = self.list_appointments()?;
        let before = appointments.len();
        appointments.retain(|a| a.child_id != child_id);
        let removed = (before - appointments.len()) as u32;
        if removed > 0 {
            self.connection.write_collection(APPOINTMENTS_FILE, &appointments)?;
        }
        Ok(removed)
    }

    fn replace_appointments(&self, appointments: &[VaccineAppointment]) -> Result<()> {
        self.connection.write_collection(APPOINTMENTS_FILE, appointments)
    }

    fn bulk_insert_appointments(&self, batch: &[VaccineAppointment]) -> Result<()> {
        let mut appointments = self.list_appointments()?;
        appointments.extend_from_slice(batch);
        self.connection.write_collection(APPOINTMENTS_FILE, &appointments)
    }

    fn clear_appointments(&self) -> Result<()> {
        self.connection.write_collection::<VaccineAppointment>(APPOINTMENTS_FILE, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::json::test_utils::TestEnvironment;

    fn appt(child_id: &str, vaccine: &str, date: &str) -> VaccineAppointment {
        VaccineAppointment {
            child_id: child_id.to_string(),
            vaccine_name: vaccine.to_string(),
            planned_date: date.to_string(),
        }
    }

    #[test]
    fn put_is_an_upsert_on_the_composite_key() {
        let env = TestEnvironment::new().unwrap();
        let repo = AppointmentRepository::new(env.connection.clone());

        repo.put_appointment(&appt("c1", "MMR (Dose 1)", "2026-01-01")).unwrap();
        repo.put_appointment(&appt("c1", "MMR (Dose 1)", "2026-02-01")).unwrap();
        repo.put_appointment(&appt("c2", "MMR (Dose 1)", "2026-02-01")).unwrap();

        let all = repo.list_appointments().unwrap();
        assert_eq!(all.len(), 2);
        let c1 = all.iter().find(|a| a.child_id == "c1").unwrap();
        assert_eq!(c1.planned_date, "2026-02-01");
    }

    #[test]
    fn delete_matches_both_key_fields() {
        let env = TestEnvironment::new().unwrap();
        let repo = AppointmentRepository::new(env.connection.clone());

        repo.put_appointment(&appt("c1", "Hepatitis B", "2026-01-01")).unwrap();
        assert!(!repo.delete_appointment("c2", "Hepatitis B").unwrap());
        assert!(repo.delete_appointment("c1", "Hepatitis B").unwrap());
        assert!(repo.list_appointments().unwrap().is_empty());
    }
}

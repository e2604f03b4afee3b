//! # Appointment Service
//!
//! Plan vaccination dates. Appointments are keyed by `(child, vaccine)`,
//! so setting a date is an upsert and clearing it is a delete; there is no
//! separate edit operation.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Months, NaiveDate};
use log::info;
use shared::{ActivityKind, VaccineAppointment, VACCINE_SCHEDULE};

use crate::state::StateCache;
use crate::storage::traits::{AppointmentStorage, ChildStorage};
use crate::sync::ChangeSignal;

pub struct AppointmentService {
    appointment_store: Arc<dyn AppointmentStorage>,
    child_store: Arc<dyn ChildStorage>,
    state: StateCache,
    changes: ChangeSignal,
}

impl AppointmentService {
    pub fn new(
        appointment_store: Arc<dyn AppointmentStorage>,
        child_store: Arc<dyn ChildStorage>,
        state: StateCache,
        changes: ChangeSignal,
    ) -> Self {
        Self { appointment_store, child_store, state, changes }
    }

    pub fn list_appointments(&self) -> Vec<VaccineAppointment> {
        self.state.read().expect("state cache poisoned").appointments.clone()
    }

    pub fn appointments_for_child(&self, child_id: &str) -> Vec<VaccineAppointment> {
        let state = self.state.read().expect("state cache poisoned");
        state.appointments.iter().filter(|a| a.child_id == child_id).cloned().collect()
    }

    /// Set or clear the planned date for a vaccine. `Some(date)` upserts
    /// the appointment, `None` removes it.
    pub fn update_appointment(
        &self,
        child_id: &str,
        vaccine_name: &str,
        planned_date: Option<String>,
    ) -> Result<()> {
        match planned_date {
            Some(date) => {
                let appointment = VaccineAppointment {
                    child_id: child_id.to_string(),
                    vaccine_name: vaccine_name.to_string(),
                    planned_date: date,
                };
                self.appointment_store.put_appointment(&appointment)?;
                let mut state = self.state.write().expect("state cache poisoned");
                match state
                    .appointments
                    .iter_mut()
                    .find(|a| a.composite_key() == appointment.composite_key())
                {
                    Some(existing) => *existing = appointment,
                    None => state.appointments.push(appointment),
                }
            }
            None => {
                self.appointment_store.delete_appointment(child_id, vaccine_name)?;
                let mut state = self.state.write().expect("state cache poisoned");
                state
                    .appointments
                    .retain(|a| !(a.child_id == child_id && a.vaccine_name == vaccine_name));
            }
        }
        self.changes.notify();
        Ok(())
    }

    /// Seed the standard immunization schedule for a child from their birth
    /// date. Vaccines already planned or already logged are skipped, so
    /// re-running is harmless.
    pub fn seed_schedule_for_child(&self, child_id: &str) -> Result<u32> {
        let child = self
            .child_store
            .get_child(child_id)?
            .ok_or_else(|| anyhow::anyhow!("Child not found: {}", child_id))?;
        let dob = NaiveDate::parse_from_str(&child.dob, "%Y-%m-%d")
            .map_err(|_| anyhow::anyhow!("Child {} has an invalid birth date", child_id))?;

        let mut seeded = 0;
        for entry in VACCINE_SCHEDULE {
            let skip = {
                let state = self.state.read().expect("state cache poisoned");
                state
                    .appointments
                    .iter()
                    .any(|a| a.child_id == child_id && a.vaccine_name == entry.name)
                    || state.logs.iter().any(|l| {
                        l.child_id == child_id
                            && l.kind == ActivityKind::Vaccine
                            && l.details == entry.name
                    })
            };
            if skip {
                continue;
            }

            let due = dob.checked_add_months(Months::new(entry.month)).unwrap_or(dob);
            self.update_appointment(child_id, entry.name, Some(due.format("%Y-%m-%d").to_string()))?;
            seeded += 1;
        }
        if seeded > 0 {
            info!("Seeded {} schedule appointment(s) for child {}", seeded, child_id);
        }
        Ok(seeded)
    }
}

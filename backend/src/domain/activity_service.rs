//! # Activity Service
//!
//! Mutation surface for activity logs. Besides plain create/update/delete
//! this owns the two behaviors that span collections: the sleep timer
//! toggle on the child record, and completing a vaccine appointment when
//! the matching vaccine is logged.

use std::sync::Arc;

use anyhow::Result;
use log::{debug, info};
use shared::{ActivityKind, ActivityLog};
use uuid::Uuid;

use super::invariants::clear_completed_vaccines;
use super::now_ms;
use crate::state::StateCache;
use crate::storage::traits::{ActivityLogStorage, AppointmentStorage, ChildStorage};
use crate::sync::ChangeSignal;

/// Request to record an activity. `timestamp` defaults to now.
#[derive(Debug, Clone)]
pub struct LogActivityCommand {
    pub child_id: String,
    pub kind: ActivityKind,
    pub timestamp: Option<i64>,
    pub details: String,
    pub value: Option<f64>,
    pub sub_type: Option<String>,
    pub notes: Option<String>,
    pub image_url: Option<String>,
}

impl LogActivityCommand {
    pub fn new(child_id: &str, kind: ActivityKind) -> Self {
        Self {
            child_id: child_id.to_string(),
            kind,
            timestamp: None,
            details: String::new(),
            value: None,
            sub_type: None,
            notes: None,
            image_url: None,
        }
    }
}

/// What a [`ActivityService::log_activity`] call actually did.
///
/// Sleep is a toggle: the first call only arms the timer on the child
/// record, the second produces the log.
#[derive(Debug, Clone, PartialEq)]
pub enum LogActivityOutcome {
    Logged(ActivityLog),
    SleepStarted { child_id: String, start_time: i64 },
    SleepCompleted(ActivityLog),
}

pub struct ActivityService {
    log_store: Arc<dyn ActivityLogStorage>,
    child_store: Arc<dyn ChildStorage>,
    appointment_store: Arc<dyn AppointmentStorage>,
    state: StateCache,
    changes: ChangeSignal,
}

impl ActivityService {
    pub fn new(
        log_store: Arc<dyn ActivityLogStorage>,
        child_store: Arc<dyn ChildStorage>,
        appointment_store: Arc<dyn AppointmentStorage>,
        state: StateCache,
        changes: ChangeSignal,
    ) -> Self {
        Self { log_store, child_store, appointment_store, state, changes }
    }

    pub fn list_logs(&self) -> Vec<ActivityLog> {
        self.state.read().expect("state cache poisoned").logs.clone()
    }

    pub fn logs_for_child(&self, child_id: &str) -> Vec<ActivityLog> {
        let state = self.state.read().expect("state cache poisoned");
        state.logs.iter().filter(|l| l.child_id == child_id).cloned().collect()
    }

    /// Record an activity for a child.
    pub fn log_activity(&self, command: LogActivityCommand) -> Result<LogActivityOutcome> {
        let child = self
            .child_store
            .get_child(&command.child_id)?
            .ok_or_else(|| anyhow::anyhow!("Child not found: {}", command.child_id))?;

        if command.kind == ActivityKind::Sleep {
            return self.toggle_sleep(child, command);
        }

        let now = now_ms();
        let log = ActivityLog {
            id: Uuid::new_v4().to_string(),
            child_id: command.child_id,
            kind: command.kind,
            timestamp: command.timestamp.unwrap_or(now),
            details: command.details,
            value: command.value,
            sub_type: command.sub_type,
            notes: command.notes,
            image_url: command.image_url,
            updated_at: now,
        };

        self.log_store.store_log(&log)?;
        {
            let mut state = self.state.write().expect("state cache poisoned");
            state.logs.push(log.clone());
        }
        info!("Logged {:?} activity for child {}", log.kind, log.child_id);

        if log.kind == ActivityKind::Vaccine {
            self.complete_vaccine_appointments()?;
        }

        self.changes.notify();
        Ok(LogActivityOutcome::Logged(log))
    }

    /// First call arms the timer on the child record, second call writes a
    /// sleep log covering the elapsed session and disarms the timer.
    fn toggle_sleep(
        &self,
        mut child: shared::Child,
        command: LogActivityCommand,
    ) -> Result<LogActivityOutcome> {
        let now = now_ms();
        let event_time = command.timestamp.unwrap_or(now);

        let Some(start_time) = child.sleep_start_time else {
            child.sleep_start_time = Some(event_time);
            child.updated_at = now;
            self.child_store.update_child(&child)?;
            self.replace_cached_child(&child);
            self.changes.notify();
            info!("Sleep timer started for child {}", child.id);
            return Ok(LogActivityOutcome::SleepStarted { child_id: child.id, start_time: event_time });
        };

        let minutes = (((event_time - start_time).max(0)) / 60_000).max(1);
        let details = if command.details.is_empty() {
            format_sleep_details(minutes)
        } else {
            command.details
        };
        let log = ActivityLog {
            id: Uuid::new_v4().to_string(),
            child_id: child.id.clone(),
            kind: ActivityKind::Sleep,
            timestamp: start_time,
            details,
            value: Some(minutes as f64),
            sub_type: command.sub_type,
            notes: command.notes,
            image_url: None,
            updated_at: now,
        };

        child.sleep_start_time = None;
        child.updated_at = now;
        self.child_store.update_child(&child)?;
        self.log_store.store_log(&log)?;
        {
            let mut state = self.state.write().expect("state cache poisoned");
            state.logs.push(log.clone());
        }
        self.replace_cached_child(&child);
        self.changes.notify();
        info!("Sleep session of {} min logged for child {}", minutes, child.id);
        Ok(LogActivityOutcome::SleepCompleted(log))
    }

    /// Replace an existing log, matched by id. Re-stamps the edit time so
    /// the change wins the next sync merge.
    pub fn update_log(&self, mut log: ActivityLog) -> Result<ActivityLog> {
        log.updated_at = now_ms();
        self.log_store.update_log(&log)?;
        {
            let mut state = self.state.write().expect("state cache poisoned");
            if let Some(existing) = state.logs.iter_mut().find(|l| l.id == log.id) {
                *existing = log.clone();
            }
        }

        if log.kind == ActivityKind::Vaccine {
            self.complete_vaccine_appointments()?;
        }

        self.changes.notify();
        Ok(log)
    }

    pub fn delete_log(&self, log_id: &str) -> Result<bool> {
        let removed = self.log_store.delete_log(log_id)?;
        if removed {
            let mut state = self.state.write().expect("state cache poisoned");
            state.logs.retain(|l| l.id != log_id);
            drop(state);
            self.changes.notify();
            debug!("Deleted log {}", log_id);
        }
        Ok(removed)
    }

    fn replace_cached_child(&self, child: &shared::Child) {
        let mut state = self.state.write().expect("state cache poisoned");
        if let Some(existing) = state.children.iter_mut().find(|c| c.id == child.id) {
            *existing = child.clone();
        }
    }

    /// Drop appointments whose vaccine now has a matching log.
    fn complete_vaccine_appointments(&self) -> Result<()> {
        let mut state = self.state.write().expect("state cache poisoned");
        let remaining = clear_completed_vaccines(&state.logs, state.appointments.clone());
        if remaining.len() != state.appointments.len() {
            self.appointment_store.replace_appointments(&remaining)?;
            info!(
                "Cleared {} completed vaccine appointment(s)",
                state.appointments.len() - remaining.len()
            );
            state.appointments = remaining;
        }
        Ok(())
    }
}

/// "Slept for 1h 5m" / "Slept for 45m".
fn format_sleep_details(minutes: i64) -> String {
    if minutes >= 60 {
        format!("Slept for {}h {}m", minutes / 60, minutes % 60)
    } else {
        format!("Slept for {}m", minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::new_state_cache;
    use crate::storage::json::test_utils::TestEnvironment;
    use crate::storage::json::{AppointmentRepository, ChildRepository, LogRepository};
    use shared::{Child, Gender, VaccineAppointment};

    struct Fixture {
        service: ActivityService,
        state: StateCache,
        _env: TestEnvironment,
    }

    fn fixture_with_child() -> Fixture {
        let env = TestEnvironment::new().unwrap();
        let child_repo = ChildRepository::new(env.connection.clone());
        let child = Child {
            id: "c1".to_string(),
            name: "Leo".to_string(),
            dob: "2025-01-01".to_string(),
            photo_url: String::new(),
            gender: Gender::Boy,
            updated_at: 1,
            sleep_start_time: None,
        };
        child_repo.store_child(&child).unwrap();

        let state = new_state_cache();
        state.write().unwrap().children.push(child);

        let service = ActivityService::new(
            Arc::new(LogRepository::new(env.connection.clone())),
            Arc::new(child_repo),
            Arc::new(AppointmentRepository::new(env.connection.clone())),
            state.clone(),
            ChangeSignal::disconnected(),
        );
        Fixture { service, state, _env: env }
    }

    #[test]
    fn logging_stores_and_caches_the_record() {
        let fx = fixture_with_child();
        let mut command = LogActivityCommand::new("c1", ActivityKind::Diaper);
        command.details = "wet".to_string();

        let outcome = fx.service.log_activity(command).unwrap();
        let LogActivityOutcome::Logged(log) = outcome else {
            panic!("plain activity must produce a log");
        };
        assert!(log.updated_at > 0);
        assert_eq!(fx.state.read().unwrap().logs.len(), 1);
        assert_eq!(fx.service.logs_for_child("c1").len(), 1);
    }

    #[test]
    fn logging_for_unknown_child_fails() {
        let fx = fixture_with_child();
        let command = LogActivityCommand::new("ghost", ActivityKind::Diaper);
        assert!(fx.service.log_activity(command).is_err());
    }

    #[test]
    fn sleep_logging_is_a_two_step_toggle() {
        let fx = fixture_with_child();

        let mut start = LogActivityCommand::new("c1", ActivityKind::Sleep);
        start.timestamp = Some(1_000_000);
        let outcome = fx.service.log_activity(start).unwrap();
        assert_eq!(
            outcome,
            LogActivityOutcome::SleepStarted { child_id: "c1".to_string(), start_time: 1_000_000 }
        );
        assert!(fx.state.read().unwrap().logs.is_empty(), "first tap only arms the timer");
        let cached = fx.state.read().unwrap().children[0].clone();
        assert_eq!(cached.sleep_start_time, Some(1_000_000));

        // 45 minutes later the second tap closes the session.
        let mut stop = LogActivityCommand::new("c1", ActivityKind::Sleep);
        stop.timestamp = Some(1_000_000 + 45 * 60_000);
        let outcome = fx.service.log_activity(stop).unwrap();
        let LogActivityOutcome::SleepCompleted(log) = outcome else {
            panic!("second tap must complete the session");
        };
        assert_eq!(log.timestamp, 1_000_000, "log covers the session from its start");
        assert_eq!(log.value, Some(45.0));
        assert_eq!(log.details, "Slept for 45m");
        assert!(fx.state.read().unwrap().children[0].sleep_start_time.is_none());
    }

    #[test]
    fn sleep_details_formatting() {
        assert_eq!(format_sleep_details(1), "Slept for 1m");
        assert_eq!(format_sleep_details(60), "Slept for 1h 0m");
        assert_eq!(format_sleep_details(65), "Slept for 1h 5m");
    }

    #[test]
    fn vaccine_log_completes_the_matching_appointment() {
        let fx = fixture_with_child();
        let appt = VaccineAppointment {
            child_id: "c1".to_string(),
            vaccine_name: "MMR (Dose 1)".to_string(),
            planned_date: "2026-07-01".to_string(),
        };
        fx.service.appointment_store.put_appointment(&appt).unwrap();
        fx.state.write().unwrap().appointments.push(appt);

        let mut command = LogActivityCommand::new("c1", ActivityKind::Vaccine);
        command.details = "MMR (Dose 1)".to_string();
        fx.service.log_activity(command).unwrap();

        assert!(fx.state.read().unwrap().appointments.is_empty());
        assert!(fx.service.appointment_store.list_appointments().unwrap().is_empty());
    }

    #[test]
    fn update_restamps_the_edit_time() {
        let fx = fixture_with_child();
        let command = LogActivityCommand::new("c1", ActivityKind::Bottle);
        let LogActivityOutcome::Logged(mut log) = fx.service.log_activity(command).unwrap() else {
            panic!("expected a log");
        };

        let before = log.updated_at;
        log.value = Some(120.0);
        log.updated_at = 0;
        let updated = fx.service.update_log(log).unwrap();
        assert!(updated.updated_at >= before);
        assert_eq!(fx.state.read().unwrap().logs[0].value, Some(120.0));
    }

    #[test]
    fn delete_removes_from_store_and_cache() {
        let fx = fixture_with_child();
        let command = LogActivityCommand::new("c1", ActivityKind::Food);
        let LogActivityOutcome::Logged(log) = fx.service.log_activity(command).unwrap() else {
            panic!("expected a log");
        };

        assert!(fx.service.delete_log(&log.id).unwrap());
        assert!(!fx.service.delete_log(&log.id).unwrap());
        assert!(fx.state.read().unwrap().logs.is_empty());
    }
}

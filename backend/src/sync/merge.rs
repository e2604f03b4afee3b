//! Last-writer-wins record merge.
//!
//! `merge` reconciles a local and a remote collection of the same record
//! kind: the result is the union of identities, and where both sides carry
//! the same identity the record with the greater edit timestamp wins, local
//! winning ties. It is a pure function; persisting the result is the
//! orchestrator's job.
//!
//! The known limit of whole-record last-writer-wins: two concurrent
//! field-level edits to the same record cannot be combined, one of them is
//! superseded entirely.

use std::collections::HashMap;

use shared::{ActivityLog, Caregiver, Child, JoinRequest, VaccineAppointment};

/// A record kind that participates in timestamp-based merging.
pub trait Merge {
    /// Identity used to match records across local and remote.
    fn merge_key(&self) -> String;

    /// Edit timestamp compared during conflicts. Records predating edit
    /// tracking report 0 and therefore always lose to a stamped
    /// counterpart.
    fn merge_timestamp(&self) -> i64;
}

impl Merge for Child {
    fn merge_key(&self) -> String {
        self.id.clone()
    }

    fn merge_timestamp(&self) -> i64 {
        self.updated_at
    }
}

impl Merge for ActivityLog {
    fn merge_key(&self) -> String {
        self.id.clone()
    }

    fn merge_timestamp(&self) -> i64 {
        // Logs written before edit tracking only carry the event time.
        if self.updated_at > 0 {
            self.updated_at
        } else {
            self.timestamp
        }
    }
}

impl Merge for Caregiver {
    fn merge_key(&self) -> String {
        self.id.clone()
    }

    fn merge_timestamp(&self) -> i64 {
        self.updated_at
    }
}

impl Merge for JoinRequest {
    fn merge_key(&self) -> String {
        self.id.clone()
    }

    fn merge_timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// Reconcile a local and a remote collection.
///
/// Every identity present in either input appears exactly once in the
/// output. Remote-only records are adopted; a conflicting remote record
/// replaces the local one only when its timestamp is strictly greater.
pub fn merge<T: Merge + Clone>(local: &[T], remote: &[T]) -> Vec<T> {
    let mut result: Vec<T> = local.to_vec();
    let mut index: HashMap<String, usize> =
        result.iter().enumerate().map(|(i, r)| (r.merge_key(), i)).collect();

    for remote_record in remote {
        match index.get(&remote_record.merge_key()) {
            None => {
                index.insert(remote_record.merge_key(), result.len());
                result.push(remote_record.clone());
            }
            Some(&i) => {
                if remote_record.merge_timestamp() > result[i].merge_timestamp() {
                    result[i] = remote_record.clone();
                }
            }
        }
    }

    result
}

/// Reconcile appointments.
///
/// Appointments carry no edit timestamp, so there is nothing to compare:
/// the local entry wins outright and remote entries only fill gaps absent
/// locally. Union-with-local-precedence, deliberately simpler than the
/// timestamped merge because appointments are low-stakes planning data.
pub fn merge_appointments(
    local: &[VaccineAppointment],
    remote: &[VaccineAppointment],
) -> Vec<VaccineAppointment> {
    let mut result: Vec<VaccineAppointment> = local.to_vec();
    let mut seen: std::collections::HashSet<String> =
        result.iter().map(|a| a.composite_key()).collect();

    for remote_appt in remote {
        if seen.insert(remote_appt.composite_key()) {
            result.push(remote_appt.clone());
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{ActivityKind, Gender};
    use std::collections::HashSet;

    fn child(id: &str, name: &str, updated_at: i64) -> Child {
        Child {
            id: id.to_string(),
            name: name.to_string(),
            dob: "2025-01-01".to_string(),
            photo_url: String::new(),
            gender: Gender::Boy,
            updated_at,
            sleep_start_time: None,
        }
    }

    fn log(id: &str, timestamp: i64, updated_at: i64) -> ActivityLog {
        ActivityLog {
            id: id.to_string(),
            child_id: "c1".to_string(),
            kind: ActivityKind::Diaper,
            timestamp,
            details: String::new(),
            value: None,
            sub_type: None,
            notes: None,
            image_url: None,
            updated_at,
        }
    }

    fn appt(child_id: &str, vaccine: &str, date: &str) -> VaccineAppointment {
        VaccineAppointment {
            child_id: child_id.to_string(),
            vaccine_name: vaccine.to_string(),
            planned_date: date.to_string(),
        }
    }

    #[test]
    fn merge_is_idempotent() {
        let set = vec![child("a", "A", 10), child("b", "B", 20)];
        let merged = merge(&set, &set);
        assert_eq!(merged, set);
    }

    #[test]
    fn merge_is_a_union_of_identities() {
        let local = vec![child("a", "A", 10), child("b", "B", 20)];
        let remote = vec![child("b", "B2", 5), child("c", "C", 30)];

        let merged = merge(&local, &remote);
        let ids: HashSet<&str> = merged.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, HashSet::from(["a", "b", "c"]));
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn newer_remote_replaces_local() {
        // Device B edited c1 at 200 and synced first; device A holds 100.
        let local = vec![child("c1", "Leo", 100)];
        let remote = vec![child("c1", "Leo B.", 200)];

        let merged = merge(&local, &remote);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "Leo B.");
    }

    #[test]
    fn local_wins_ties_and_newer_local_edits() {
        let remote = vec![child("c1", "remote", 200)];

        for local_ts in [200, 250] {
            let local = vec![child("c1", "local", local_ts)];
            let merged = merge(&local, &remote);
            assert_eq!(merged[0].name, "local", "local ts {} must win", local_ts);
        }
    }

    #[test]
    fn untimestamped_record_always_loses() {
        let legacy = vec![log("l1", 0, 0)];
        let stamped = vec![log("l1", 500, 0)];

        // Stamped remote supersedes the legacy local record.
        let merged = merge(&legacy, &stamped);
        assert_eq!(merged[0].timestamp, 500);

        // And the legacy remote never supersedes a stamped local one.
        let merged = merge(&stamped, &legacy);
        assert_eq!(merged[0].timestamp, 500);
    }

    #[test]
    fn log_timestamp_is_fallback_for_missing_updated_at() {
        // Local edited at 300; remote never edited but logged at 400.
        let local = vec![log("l1", 100, 300)];
        let remote = vec![log("l1", 400, 0)];

        let merged = merge(&local, &remote);
        assert_eq!(merged[0].timestamp, 400);
    }

    #[test]
    fn result_size_stays_within_bounds() {
        let local = vec![child("a", "A", 1), child("b", "B", 1)];
        let remote = vec![child("b", "B", 2), child("c", "C", 1), child("d", "D", 1)];

        let merged = merge(&local, &remote);
        assert!(merged.len() >= local.len().max(remote.len()));
        assert!(merged.len() <= local.len() + remote.len());

        let ids: HashSet<String> = merged.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids.len(), merged.len(), "no duplicate identities");
    }

    #[test]
    fn appointments_union_keeps_local_and_fills_gaps() {
        let local = vec![appt("c1", "MMR (Dose 1)", "2026-01-01")];
        let remote = vec![
            appt("c1", "MMR (Dose 1)", "2026-09-09"),
            appt("c1", "Hepatitis B", "2026-02-02"),
        ];

        let merged = merge_appointments(&local, &remote);
        assert_eq!(merged.len(), 2);

        let mmr = merged.iter().find(|a| a.vaccine_name == "MMR (Dose 1)").unwrap();
        assert_eq!(mmr.planned_date, "2026-01-01", "local entry wins outright");
        assert!(merged.iter().any(|a| a.vaccine_name == "Hepatitis B"));
    }
}

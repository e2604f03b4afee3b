//! Record model and wire types for the baby activity tracker.
//!
//! These types are shared between the backend core and any presentation
//! layer, and they double as the wire format of the cloud snapshot: field
//! names serialize as camelCase so snapshots written by older app builds
//! remain readable.

use serde::{Deserialize, Serialize};

/// The kind of event captured by an [`ActivityLog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    Nursing,
    Bottle,
    Food,
    Diaper,
    Sleep,
    Health,
    Growth,
    Vaccine,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Boy,
    Girl,
}

/// Access level a caregiver holds within a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessLevel {
    Owner,
    Editor,
    Viewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaregiverStatus {
    Pending,
    Approved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinRequestStatus {
    Pending,
    Approved,
    Denied,
}

/// A tracked child.
///
/// `updated_at` is stamped (epoch milliseconds) on every edit and is the
/// conflict tie-breaker during sync. `sleep_start_time` marks an in-progress
/// sleep session; it is cleared when the session is logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Child {
    pub id: String,
    pub name: String,
    /// Birth date as an ISO `YYYY-MM-DD` string. Immutable in practice.
    pub dob: String,
    #[serde(default)]
    pub photo_url: String,
    pub gender: Gender,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_start_time: Option<i64>,
}

/// A single logged event (feed, diaper, sleep, vaccine, growth, note...).
///
/// `timestamp` is the event time; `updated_at` is the edit time. Sync
/// compares `updated_at` first and falls back to `timestamp` for records
/// written before edit tracking existed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: String,
    pub child_id: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub timestamp: i64,
    #[serde(default)]
    pub details: String,
    /// Numeric payload where the kind has one (minutes slept, weight, ml).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub updated_at: i64,
}

/// A planned vaccination date.
///
/// Appointments have no independent id and no edit timestamp: identity is
/// the composite `(child_id, vaccine_name)` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaccineAppointment {
    pub child_id: String,
    pub vaccine_name: String,
    /// ISO date string.
    pub planned_date: String,
}

impl VaccineAppointment {
    /// Composite identity used for dedup and merge.
    pub fn composite_key(&self) -> String {
        format!("{}\u{1f}{}", self.child_id, self.vaccine_name)
    }
}

/// A family member with access to the records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caregiver {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub photo_url: String,
    pub access_level: AccessLevel,
    pub status: CaregiverStatus,
    #[serde(default)]
    pub joined_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

/// A pending request to join a family, keyed by invite code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub invite_code: String,
    pub status: JoinRequestStatus,
    #[serde(default)]
    pub timestamp: i64,
}

/// The full serialized state of all five collections as stored in the
/// remote blob channel.
///
/// Arrays absent from older snapshots deserialize as empty rather than
/// failing, so the schema can grow without breaking existing cloud files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub logs: Vec<ActivityLog>,
    #[serde(default)]
    pub children: Vec<Child>,
    #[serde(default)]
    pub appointments: Vec<VaccineAppointment>,
    #[serde(default)]
    pub caregivers: Vec<Caregiver>,
    #[serde(default)]
    pub join_requests: Vec<JoinRequest>,
    #[serde(default)]
    pub last_sync: i64,
}

/// One entry of the standard immunization schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaccineScheduleEntry {
    /// Age in months at which the dose is due.
    pub month: u32,
    pub name: &'static str,
}

/// Standard immunization schedule used to seed appointment planning.
pub const VACCINE_SCHEDULE: &[VaccineScheduleEntry] = &[
    VaccineScheduleEntry { month: 0, name: "BCG (Bacillus Calmette-Guérin)" },
    VaccineScheduleEntry { month: 0, name: "Hepatitis B" },
    VaccineScheduleEntry { month: 2, name: "DTaP-IPV-HepB-Hib (Dose 1)" },
    VaccineScheduleEntry { month: 3, name: "DTaP-IPV-HepB-Hib (Dose 2)" },
    VaccineScheduleEntry { month: 5, name: "DTaP-IPV-HepB-Hib (Dose 3)" },
    VaccineScheduleEntry { month: 6, name: "Measles (Sabah only)" },
    VaccineScheduleEntry { month: 9, name: "MMR (Dose 1)" },
    VaccineScheduleEntry { month: 9, name: "Pneumococcal (PCV) (Dose 1)" },
    VaccineScheduleEntry { month: 9, name: "JE (Sarawak only)" },
    VaccineScheduleEntry { month: 12, name: "MMR (Dose 2)" },
    VaccineScheduleEntry { month: 12, name: "Pneumococcal (PCV) (Dose 2)" },
    VaccineScheduleEntry { month: 15, name: "Pneumococcal (PCV) (Booster)" },
    VaccineScheduleEntry { month: 18, name: "DTaP-IPV-HepB-Hib (Booster)" },
    VaccineScheduleEntry { month: 21, name: "JE (Booster)" },
    VaccineScheduleEntry { month: 84, name: "MR (Booster)" },
    VaccineScheduleEntry { month: 84, name: "DT (Booster)" },
    VaccineScheduleEntry { month: 156, name: "HPV (Girls only)" },
    VaccineScheduleEntry { month: 180, name: "ATT-Tetanus (Booster)" },
];

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default specialist when no keyword matches.
pub const PRIMARY_CARE: &str = "Primary Care Physician";

/// Walk-in specialty that is always hoisted and never listed for manual
/// selection.
pub const EMERGENCY_MEDICINE: &str = "Emergency Medicine";

const APPOINTMENT_ID_PREFIX: &str = "APT-";

/// `APT-` followed by the sequence number zero-padded to four digits.
pub fn format_appointment_id(seq: u32) -> String {
    format!("{APPOINTMENT_ID_PREFIX}{seq:04}")
}

/// Sequence number of an `APT-NNNN` identifier.
pub fn parse_appointment_seq(id: &str) -> Option<u32> {
    id.strip_prefix(APPOINTMENT_ID_PREFIX)?.parse().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Confirmed,
}

/// Directory entry for one specialist type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specialist {
    #[serde(rename = "type")]
    pub specialist_type: String,
    pub name: String,
    pub specialty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hospital: Option<String>,
    /// English weekday names on which the specialist takes appointments.
    #[serde(default = "weekdays")]
    pub available_days: Vec<String>,
}

impl Specialist {
    pub fn works_on(&self, weekday_name: &str) -> bool {
        self.available_days
            .iter()
            .any(|d| d.eq_ignore_ascii_case(weekday_name))
    }
}

pub fn weekdays() -> Vec<String> {
    ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"]
        .iter()
        .map(|d| d.to_string())
        .collect()
}

/// A bookable time slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub datetime: NaiveDateTime,
    pub display: String,
    pub available: bool,
}

/// Validated booking data, before an identifier is allocated.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentDraft {
    pub patient_name: String,
    pub patient_email: Option<String>,
    pub patient_phone: Option<String>,
    pub specialist: Specialist,
    pub datetime: NaiveDateTime,
    pub reason: String,
    pub routing_reasoning: Option<String>,
}

impl AppointmentDraft {
    pub fn into_appointment(self, id: String, booked_at: DateTime<Utc>) -> Appointment {
        Appointment {
            id,
            patient_name: self.patient_name,
            patient_email: self.patient_email,
            patient_phone: self.patient_phone,
            specialist_type: self.specialist.specialist_type.clone(),
            specialist: self.specialist,
            datetime: self.datetime,
            reason: self.reason,
            routing_reasoning: self.routing_reasoning,
            status: AppointmentStatus::Confirmed,
            booked_at,
        }
    }
}

/// A persisted appointment. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub patient_name: String,
    #[serde(default)]
    pub patient_email: Option<String>,
    #[serde(default)]
    pub patient_phone: Option<String>,
    pub specialist: Specialist,
    pub specialist_type: String,
    pub datetime: NaiveDateTime,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_reasoning: Option<String>,
    pub status: AppointmentStatus,
    pub booked_at: DateTime<Utc>,
}

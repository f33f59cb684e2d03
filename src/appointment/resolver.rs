use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::reason::sanitize;
use super::slots::{self, DEFAULT_DAYS_AHEAD};
use super::validation::{is_valid_email, is_valid_phone};
use super::AppointmentError;
use crate::models::{Appointment, AppointmentDraft, Slot, Specialist};
use crate::store::{AppointmentStore, ReferenceData};

const DEFAULT_PATIENT_NAME: &str = "Patient";
const DEFAULT_REASON: &str = "General consultation";
const SUPPORT_EMAIL: &str = "support@careroute.example";
const SUPPORT_PHONE: &str = "+1 (555) 123-4567";

/// Specialists and reason suggested for a condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    /// Ordered, duplicate-free, never empty.
    pub specialist_types: Vec<String>,
    /// Directory entries for `specialist_types` that exist.
    pub specialists: Vec<Specialist>,
    pub reason: String,
}

/// Booking request as submitted by the chat page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingRequest {
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub patient_email: Option<String>,
    #[serde(default)]
    pub patient_phone: Option<String>,
    pub specialist_type: String,
    #[serde(alias = "datetime")]
    pub slot_datetime: String,
    #[serde(default)]
    pub reason: Option<String>,
    /// Condition the booking is about, used to focus the reason.
    #[serde(default)]
    pub condition: Option<String>,
    /// Routing reasoning that led to the booking.
    #[serde(default, alias = "routing_reasoning")]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Booking {
    pub appointment: Appointment,
    pub message: String,
}

/// Turns conditions into specialist suggestions and books appointments.
pub struct AppointmentResolver {
    reference: Arc<ReferenceData>,
    store: Arc<dyn AppointmentStore>,
}

impl AppointmentResolver {
    pub fn new(reference: Arc<ReferenceData>, store: Arc<dyn AppointmentStore>) -> Self {
        Self { reference, store }
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    /// Specialists for `condition` and a short reason condensed from
    /// `ai_response` (or the condition itself when there is no reply).
    pub fn resolve(&self, condition: &str, ai_response: Option<&str>) -> Resolution {
        let matcher = &self.reference.matcher;
        let specialist_types = matcher.match_text(condition);
        let specialists = self.reference.directory.resolve(&specialist_types);
        let hint = condition_hint(matcher.first_keyword(condition), condition);
        let source = ai_response
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(condition);
        let reason = sanitize(source, hint);

        tracing::debug!(
            specialists = ?specialist_types,
            reason = %reason,
            "Resolved condition"
        );
        Resolution {
            specialist_types,
            specialists,
            reason,
        }
    }

    /// Every bookable specialist except emergency medicine.
    pub fn specialist_types(&self) -> Vec<Specialist> {
        self.reference.directory.manual_selection()
    }

    pub fn slots(
        &self,
        specialist_type: &str,
        now: NaiveDateTime,
    ) -> Result<Vec<Slot>, AppointmentError> {
        let specialist = self
            .reference
            .directory
            .get(specialist_type)
            .ok_or_else(|| AppointmentError::UnknownSpecialist(specialist_type.to_string()))?;
        Ok(slots::available_slots(specialist, now, DEFAULT_DAYS_AHEAD))
    }

    /// Validate and persist a booking. Nothing is written unless every
    /// check passes.
    pub fn book(&self, request: BookingRequest) -> Result<Booking, AppointmentError> {
        let draft = self.draft(request)?;
        let appointment = self.store.append_next(draft)?;
        let message = confirmation_message(&appointment);
        tracing::info!(
            appointment_id = %appointment.id,
            specialist = %appointment.specialist_type,
            "Appointment booked"
        );
        Ok(Booking {
            appointment,
            message,
        })
    }

    pub fn list(&self) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.store.list_all()?)
    }

    fn draft(&self, request: BookingRequest) -> Result<AppointmentDraft, AppointmentError> {
        let patient_email = non_blank(request.patient_email);
        let patient_phone = non_blank(request.patient_phone);

        if let Some(email) = &patient_email {
            if !is_valid_email(email) {
                return Err(AppointmentError::Validation(format!(
                    "'{email}' is not a valid email address"
                )));
            }
        }
        if let Some(phone) = &patient_phone {
            if !is_valid_phone(phone) {
                return Err(AppointmentError::Validation(format!(
                    "'{phone}' is not a valid phone number"
                )));
            }
        }
        if patient_email.is_none() && patient_phone.is_none() {
            return Err(AppointmentError::Validation(
                "an email address or phone number is required".into(),
            ));
        }

        let specialist_type = request.specialist_type.trim();
        let specialist = self
            .reference
            .directory
            .get(specialist_type)
            .cloned()
            .ok_or_else(|| AppointmentError::UnknownSpecialist(specialist_type.to_string()))?;

        let datetime = parse_slot(&request.slot_datetime).ok_or_else(|| {
            AppointmentError::Validation(format!(
                "'{}' is not an ISO-8601 date and time",
                request.slot_datetime
            ))
        })?;

        let raw_reason = non_blank(request.reason).unwrap_or_else(|| DEFAULT_REASON.to_string());
        let condition = non_blank(request.condition);
        let matcher = &self.reference.matcher;
        let hint = match &condition {
            Some(condition) => condition_hint(matcher.first_keyword(condition), condition),
            None => matcher.first_keyword(&raw_reason),
        };
        let reason = sanitize(&raw_reason, hint);

        Ok(AppointmentDraft {
            patient_name: non_blank(request.patient_name)
                .unwrap_or_else(|| DEFAULT_PATIENT_NAME.to_string()),
            patient_email,
            patient_phone,
            specialist,
            datetime,
            reason,
            routing_reasoning: non_blank(request.reasoning),
        })
    }
}

/// Matched keyword when there is one, else the condition text itself.
fn condition_hint<'a>(keyword: Option<&'a str>, condition: &'a str) -> Option<&'a str> {
    keyword.or_else(|| Some(condition.trim()).filter(|c| !c.is_empty()))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accepts local ISO-8601 (`2025-01-27T09:00:00`, seconds optional) or
/// RFC 3339 with an offset; the wall-clock time is kept.
fn parse_slot(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    value
        .parse::<NaiveDateTime>()
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.naive_local())
        })
}

fn confirmation_message(appointment: &Appointment) -> String {
    format!(
        "See you on {}!\n\n\
         Your appointment with {} has been confirmed.\n\n\
         Meanwhile, if you have any questions or need to reschedule:\n\
         Email us at: {SUPPORT_EMAIL}\n\
         Call us at: {SUPPORT_PHONE}\n\n\
         We look forward to seeing you!",
        slots::display(&appointment.datetime),
        appointment.specialist.name,
    )
}

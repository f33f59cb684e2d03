use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::atomic::{read_json, write_json};
use super::StoreError;
use crate::models::{format_appointment_id, parse_appointment_seq, Appointment, AppointmentDraft};

/// Persistence for appointments.
///
/// Identifier allocation and the write of the new record share one
/// critical section across the whole store.
pub trait AppointmentStore: Send + Sync {
    fn count(&self) -> Result<usize, StoreError>;

    fn list_all(&self) -> Result<Vec<Appointment>, StoreError>;

    /// Allocate the next `APT-NNNN` id from the persisted records and
    /// append the appointment, atomically with respect to other callers.
    fn append_next(&self, draft: AppointmentDraft) -> Result<Appointment, StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AppointmentsFile {
    #[serde(default)]
    appointments: Vec<Appointment>,
}

/// All appointments in one flat file: `{"appointments": [...]}`.
pub struct JsonAppointmentStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonAppointmentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn read(&self) -> Result<AppointmentsFile, StoreError> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }
}

/// Next sequence number: one past the larger of the record count and the
/// highest sequence already used, so removed records never cause reuse.
fn next_seq(existing: &[Appointment]) -> u32 {
    let highest = existing
        .iter()
        .filter_map(|a| parse_appointment_seq(&a.id))
        .max()
        .unwrap_or(0);
    let count = u32::try_from(existing.len()).unwrap_or(u32::MAX);
    highest.max(count).saturating_add(1)
}

impl AppointmentStore for JsonAppointmentStore {
    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.appointments.len())
    }

    fn list_all(&self) -> Result<Vec<Appointment>, StoreError> {
        Ok(self.read()?.appointments)
    }

    fn append_next(&self, draft: AppointmentDraft) -> Result<Appointment, StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::LockPoisoned)?;

        let mut file = self.read()?;
        let id = format_appointment_id(next_seq(&file.appointments));
        let appointment = draft.into_appointment(id, Utc::now());
        file.appointments.push(appointment.clone());
        write_json(&self.path, &file)?;

        tracing::info!(
            appointment_id = %appointment.id,
            specialist_type = %appointment.specialist_type,
            "Appointment stored"
        );
        Ok(appointment)
    }
}

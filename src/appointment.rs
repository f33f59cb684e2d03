//! Appointment scheduling: keyword-driven specialist matching, reason
//! condensing, contact validation, slot listing and booking.

pub mod keywords;
pub mod reason;
pub mod resolver;
pub mod slots;
pub mod validation;

use thiserror::Error;

use crate::store::StoreError;

pub use crate::models::format_appointment_id;
pub use keywords::{KeywordEntry, KeywordMatcher, KeywordOverlap};
pub use reason::sanitize;
pub use resolver::{AppointmentResolver, Booking, BookingRequest, Resolution};

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Invalid booking request: {0}")]
    Validation(String),

    #[error("Unknown specialist type: {0}")]
    UnknownSpecialist(String),

    #[error("Appointment store error: {0}")]
    Store(#[from] StoreError),
}

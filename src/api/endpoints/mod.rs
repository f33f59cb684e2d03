//! API endpoint handlers, one module per feature.

pub mod appointments;
pub mod chat;
pub mod health;

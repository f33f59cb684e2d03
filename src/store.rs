//! File-backed persistence: chat sessions, appointments and the read-only
//! reference data (specialist directory and keyword table).

pub mod appointments;
pub mod atomic;
pub mod reference;
pub mod sessions;

use thiserror::Error;

pub use appointments::{AppointmentStore, JsonAppointmentStore};
pub use reference::{ReferenceData, SpecialistDirectory};
pub use sessions::{JsonSessionStore, SessionStore};

/// Longest accepted session identifier.
pub const MAX_SESSION_ID_LEN: usize = 128;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid session id: {0:?}")]
    InvalidSessionId(String),

    #[error("Invalid reference data: {0}")]
    InvalidReference(String),

    #[error("Lock poisoned")]
    LockPoisoned,
}

/// Session ids name files on disk: 1..=128 chars of `[A-Za-z0-9_-]`.
pub fn validate_session_id(id: &str) -> Result<(), StoreError> {
    let valid = !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidSessionId(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_generated_style_ids() {
        assert!(validate_session_id("chat_20250314_092653_a1b2c3d4").is_ok());
        assert!(validate_session_id("abc-123").is_ok());
    }

    #[test]
    fn rejects_path_like_or_oversized_ids() {
        for bad in ["", "../etc/passwd", "a/b", "with space", "dot.json"] {
            assert!(
                matches!(validate_session_id(bad), Err(StoreError::InvalidSessionId(_))),
                "accepted {bad:?}"
            );
        }
        assert!(validate_session_id(&"a".repeat(129)).is_err());
        assert!(validate_session_id(&"a".repeat(128)).is_ok());
    }
}

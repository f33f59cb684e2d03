//! One chat message end to end: decide, respond, persist.
//!
//! Work for a session runs under that session's async lock, so a rapid
//! double-submit is processed in order and the second message sees the
//! first one's turn. Resetting a session takes the same lock, so a message
//! still in flight cannot write the session back after it was destroyed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use super::agents::SpecialistAgentDispatch;
use super::context::ContextWindow;
use super::routing::RoutingDecisionEngine;
use crate::models::{Session, Turn};
use crate::store::{validate_session_id, SessionStore, StoreError};

/// Longest accepted chat message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// The turn was computed but could not be saved. The outcome is kept
    /// so the caller can retry the save.
    #[error("Failed to persist turn: {source}")]
    Persistence {
        outcome: Box<ChatOutcome>,
        source: StoreError,
    },

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Result of one processed message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub session_id: String,
    pub turn: Turn,
}

impl ChatOutcome {
    pub fn booking_suggested(&self) -> bool {
        self.turn
            .metadata
            .get("booking_suggested")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

type SessionLocks = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Exclusive hold on one session. Dropping it releases the lock and removes
/// the map entry once no other task holds or awaits it.
struct SessionLease<'a> {
    locks: &'a SessionLocks,
    session_id: String,
    lock: Arc<tokio::sync::Mutex<()>>,
    guard: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl Drop for SessionLease<'_> {
    fn drop(&mut self) {
        self.guard.take();
        if let Ok(mut locks) = self.locks.lock() {
            // One reference in the map, one here.
            if Arc::strong_count(&self.lock) == 2 {
                locks.remove(&self.session_id);
            }
        }
    }
}

pub struct ChatOrchestrator {
    engine: RoutingDecisionEngine,
    dispatch: SpecialistAgentDispatch,
    sessions: Arc<dyn SessionStore>,
    locks: SessionLocks,
}

impl ChatOrchestrator {
    pub fn new(
        engine: RoutingDecisionEngine,
        dispatch: SpecialistAgentDispatch,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            engine,
            dispatch,
            sessions,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    async fn lease(&self, session_id: &str) -> Result<SessionLease<'_>, ChatError> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|_| ChatError::Store(StoreError::LockPoisoned))?;
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        // Built before awaiting so a cancelled wait still prunes the entry.
        let mut lease = SessionLease {
            locks: &self.locks,
            session_id: session_id.to_string(),
            lock,
            guard: None,
        };
        lease.guard = Some(lease.lock.clone().lock_owned().await);
        Ok(lease)
    }

    #[cfg(test)]
    fn lock_entries(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }

    /// Route and answer `text` in `session_id` (a new session when `None`),
    /// then persist the turn.
    pub async fn handle_message(
        &self,
        session_id: Option<&str>,
        text: &str,
    ) -> Result<ChatOutcome, ChatError> {
        let message = validate_message(text)?;
        let session_id = match session_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => {
                validate_session_id(id).map_err(|e| ChatError::Validation(e.to_string()))?;
                id.to_string()
            }
            None => Session::generate_id(Utc::now()),
        };

        let _lease = self.lease(&session_id).await?;

        let mut window = match self.load(&session_id).await? {
            Some(session) => ContextWindow::from_session(&session),
            None => ContextWindow::new(),
        };

        let decision = self.engine.decide(message, &window).await;
        let turn = self.dispatch.respond(&decision, message, &mut window).await;

        tracing::info!(
            session_id = %session_id,
            handler = %turn.handler,
            confidence = turn.confidence,
            degraded = turn.degraded,
            "Message processed"
        );

        let outcome = ChatOutcome {
            session_id: session_id.clone(),
            turn: turn.clone(),
        };
        match self.persist(&session_id, turn).await {
            Ok(_) => Ok(outcome),
            Err(source) => {
                tracing::error!(
                    session_id = %session_id,
                    error = %source,
                    "Failed to persist turn"
                );
                Err(ChatError::Persistence {
                    outcome: Box::new(outcome),
                    source,
                })
            }
        }
    }

    /// Append an already computed turn, e.g. to retry a failed save. The
    /// turn must pass [`Turn::validate`].
    pub async fn append_turn(&self, session_id: &str, turn: Turn) -> Result<Session, ChatError> {
        validate_session_id(session_id).map_err(|e| ChatError::Validation(e.to_string()))?;
        turn.validate().map_err(ChatError::Validation)?;
        let _lease = self.lease(session_id).await?;
        Ok(self.persist(session_id, turn).await?)
    }

    /// Destroy `previous` (when given) and start a fresh session. Waits for
    /// any message in flight for `previous` to finish first.
    pub async fn reset_session(&self, previous: Option<&str>) -> Result<Session, ChatError> {
        let previous = previous.map(str::trim).filter(|s| !s.is_empty());
        let _lease = match previous {
            Some(id) => {
                validate_session_id(id).map_err(|e| ChatError::Validation(e.to_string()))?;
                Some(self.lease(id).await?)
            }
            None => None,
        };

        let sessions = self.sessions.clone();
        let previous = previous.map(str::to_string);
        tokio::task::spawn_blocking(move || sessions.reset(previous.as_deref()))
            .await
            .map_err(|e| ChatError::Store(StoreError::Io(std::io::Error::other(e.to_string()))))?
            .map_err(ChatError::Store)
    }

    /// Record a booking confirmation as a `system` turn.
    pub async fn confirm_appointment(
        &self,
        session_id: &str,
        message: &str,
        appointment_id: &str,
        reasoning: Option<&str>,
    ) -> Result<Session, ChatError> {
        if appointment_id.trim().is_empty() {
            return Err(ChatError::Validation("appointment_id is required".into()));
        }
        let mut turn = Turn::system(
            &format!("[Appointment {appointment_id} booked]"),
            message,
            reasoning.unwrap_or("Appointment confirmation"),
        )
        .with_metadata("appointment_id", appointment_id)
        .with_metadata("type", "appointment_confirmation");
        if let Some(reasoning) = reasoning.filter(|r| !r.trim().is_empty()) {
            turn = turn.with_metadata("reasoning", reasoning);
        }
        self.append_turn(session_id, turn).await
    }

    async fn load(&self, session_id: &str) -> Result<Option<Session>, ChatError> {
        let sessions = self.sessions.clone();
        let id = session_id.to_string();
        tokio::task::spawn_blocking(move || sessions.load(&id))
            .await
            .map_err(|e| ChatError::Store(StoreError::Io(std::io::Error::other(e.to_string()))))?
            .map_err(ChatError::Store)
    }

    async fn persist(&self, session_id: &str, turn: Turn) -> Result<Session, StoreError> {
        let sessions = self.sessions.clone();
        let id = session_id.to_string();
        tokio::task::spawn_blocking(move || sessions.append(&id, turn))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e.to_string())))?
    }
}

/// Trimmed message, or a validation error when blank or too long.
pub fn validate_message(text: &str) -> Result<&str, ChatError> {
    let message = text.trim();
    if message.is_empty() {
        return Err(ChatError::Validation("Message text must not be empty".into()));
    }
    let chars = message.chars().count();
    if chars > MAX_MESSAGE_CHARS {
        return Err(ChatError::Validation(format!(
            "Message is {chars} characters; the limit is {MAX_MESSAGE_CHARS}"
        )));
    }
    Ok(message)
}

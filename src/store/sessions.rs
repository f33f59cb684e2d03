use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::atomic::{read_json, write_json};
use super::{validate_session_id, StoreError};
use crate::models::{Session, SessionSummary, Turn};

/// Persistence for chat sessions.
///
/// Implementations serialize writers per session so concurrent appends to
/// one session never interleave their read of the current history.
pub trait SessionStore: Send + Sync {
    fn load(&self, session_id: &str) -> Result<Option<Session>, StoreError>;

    /// Append `turn`, creating the session when it does not exist yet.
    /// Returns the session as persisted.
    fn append(&self, session_id: &str, turn: Turn) -> Result<Session, StoreError>;

    /// Summaries of every stored session, most recently updated first.
    fn list(&self) -> Result<Vec<SessionSummary>, StoreError>;

    /// Destroy `previous` (when given) and persist a fresh empty session.
    fn reset(&self, previous: Option<&str>) -> Result<Session, StoreError>;
}

const FILE_PREFIX: &str = "chat_history_";
const FILE_SUFFIX: &str = ".json";

/// One JSON file per session: `<dir>/chat_history_<id>.json`.
pub struct JsonSessionStore {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl JsonSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            locks: Mutex::new(HashMap::new()),
        })
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir
            .join(format!("{FILE_PREFIX}{session_id}{FILE_SUFFIX}"))
    }

    /// Run `f` while holding the file lock for `session_id`. The lock's map
    /// entry is dropped again once no other caller holds or awaits it.
    fn with_lock<T>(
        &self,
        session_id: &str,
        f: impl FnOnce() -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let lock = {
            let mut locks = self.locks.lock().map_err(|_| StoreError::LockPoisoned)?;
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        let result = match lock.lock() {
            Ok(_guard) => f(),
            Err(_) => Err(StoreError::LockPoisoned),
        };

        if let Ok(mut locks) = self.locks.lock() {
            // One reference in the map, one here.
            if Arc::strong_count(&lock) == 2 {
                locks.remove(session_id);
            }
        }
        result
    }

    #[cfg(test)]
    fn lock_entries(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }
}

impl SessionStore for JsonSessionStore {
    fn load(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        validate_session_id(session_id)?;
        read_json(&self.path_for(session_id))
    }

    fn append(&self, session_id: &str, turn: Turn) -> Result<Session, StoreError> {
        validate_session_id(session_id)?;
        self.with_lock(session_id, || {
            let path = self.path_for(session_id);
            let mut session =
                read_json::<Session>(&path)?.unwrap_or_else(|| Session::new(session_id));
            session.push(turn);
            write_json(&path, &session)?;

            tracing::debug!(session_id, turns = session.turns.len(), "Session turn appended");
            Ok(session)
        })
    }

    fn list(&self) -> Result<Vec<SessionSummary>, StoreError> {
        let mut summaries = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_session_file = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(FILE_PREFIX) && n.ends_with(FILE_SUFFIX));
            if !is_session_file {
                continue;
            }
            match read_json::<Session>(&path) {
                Ok(Some(session)) => summaries.push(session.summary()),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Skipping unreadable session file"
                    );
                }
            }
        }
        summaries.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        Ok(summaries)
    }

    fn reset(&self, previous: Option<&str>) -> Result<Session, StoreError> {
        if let Some(previous) = previous {
            validate_session_id(previous)?;
            self.with_lock(previous, || match fs::remove_file(self.path_for(previous)) {
                Ok(()) => {
                    tracing::info!(session_id = previous, "Session cleared");
                    Ok(())
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            })?;
        }

        let session = Session::new(Session::generate_id(Utc::now()));
        write_json(&self.path_for(&session.session_id), &session)?;
        tracing::info!(session_id = %session.session_id, "Session created");
        Ok(session)
    }
}

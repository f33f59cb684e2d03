//! Sliding context window over a session's turns.
//!
//! Holds every turn of the session but hands the router and agents only
//! the most recent `k`, oldest first.

use crate::models::{HandlerKind, Session, Turn};

#[derive(Debug, Clone, Default)]
pub struct ContextWindow {
    turns: Vec<Turn>,
}

impl ContextWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_turns(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    pub fn from_session(session: &Session) -> Self {
        Self::from_turns(session.turns.clone())
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// The last `k` turns in chronological order (at most `k`).
    pub fn recent(&self, k: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(k);
        &self.turns[start..]
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Handler of the most recent routed (non-system) turn.
    pub fn last_handler(&self) -> Option<HandlerKind> {
        self.turns
            .iter()
            .rev()
            .map(|t| t.handler)
            .find(HandlerKind::is_routable)
    }

    /// Transcript of the last `k` turns for prompts.
    pub fn render(&self, k: usize) -> String {
        let mut out = String::new();
        for turn in self.recent(k) {
            out.push_str("User: ");
            out.push_str(turn.user_text.trim());
            out.push('\n');
            out.push_str(&format!("Assistant ({}): ", turn.handler));
            out.push_str(turn.response.trim());
            out.push('\n');
        }
        out
    }
}

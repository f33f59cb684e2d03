use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::handler::HandlerKind;

/// Maximum preview length (characters) shown in session listings.
const PREVIEW_CHARS: usize = 100;

/// Routing outcome recorded alongside each turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingMetadata {
    pub target: HandlerKind,
    pub reasoning: String,
    pub confidence: f64,
}

/// One user message and the reply it produced. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub user_text: String,
    pub handler: HandlerKind,
    pub response: String,
    pub routing: RoutingMetadata,
    /// 1.0 for a generated reply, 0.0 when the reply was degraded.
    pub confidence: f64,
    #[serde(default)]
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Bookkeeping turn that did not go through routing (e.g. an
    /// appointment confirmation).
    pub fn system(user_text: &str, response: &str, reasoning: &str) -> Self {
        Self {
            user_text: user_text.to_string(),
            handler: HandlerKind::System,
            response: response.to_string(),
            routing: RoutingMetadata {
                target: HandlerKind::System,
                reasoning: reasoning.to_string(),
                confidence: 1.0,
            },
            confidence: 1.0,
            degraded: false,
            metadata: Map::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Check a turn supplied from outside the pipeline: user text present,
    /// both confidences within [0, 1], and the handler equal to the routed
    /// target.
    pub fn validate(&self) -> Result<(), String> {
        if self.user_text.trim().is_empty() {
            return Err("turn user_text must not be empty".into());
        }
        for (field, value) in [
            ("confidence", self.confidence),
            ("routing.confidence", self.routing.confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("turn {field} {value} is outside [0, 1]"));
            }
        }
        if self.handler != self.routing.target {
            return Err(format!(
                "turn handler '{}' does not match routing target '{}'",
                self.handler, self.routing.target
            ));
        }
        Ok(())
    }
}

/// A conversation and its ordered turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub turns: Vec<Turn>,
}

impl Session {
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            started_at: now,
            last_updated: now,
            turns: Vec::new(),
        }
    }

    /// Fresh identifier: `chat_<YYYYmmdd_HHMMSS>_<8 hex chars>`.
    pub fn generate_id(now: DateTime<Utc>) -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("chat_{}_{}", now.format("%Y%m%d_%H%M%S"), &suffix[..8])
    }

    pub fn push(&mut self, turn: Turn) {
        self.last_updated = turn.created_at.max(self.last_updated);
        self.turns.push(turn);
    }

    pub fn summary(&self) -> SessionSummary {
        let preview = self
            .turns
            .iter()
            .find(|t| t.handler != HandlerKind::System)
            .or(self.turns.first())
            .map(|t| truncate_chars(t.user_text.trim(), PREVIEW_CHARS))
            .unwrap_or_default();

        SessionSummary {
            session_id: self.session_id.clone(),
            started_at: self.started_at,
            last_updated: self.last_updated,
            message_count: self.turns.len(),
            preview,
        }
    }
}

/// Listing entry for a stored session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub message_count: usize,
    pub preview: String,
}

/// Cut `text` to at most `max` characters on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte, _)) => text[..byte].to_string(),
        None => text.to_string(),
    }
}

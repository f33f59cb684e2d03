use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Category a turn was handled by.
///
/// The first four are routing targets. `System` tags bookkeeping turns
/// (appointment confirmations) and is never produced by routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    Symptom,
    Medication,
    Lifestyle,
    Fallback,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown handler tag: '{0}'")]
pub struct UnknownHandler(pub String);

impl HandlerKind {
    /// Handlers a routing decision may target.
    pub const ROUTABLE: [HandlerKind; 4] = [
        HandlerKind::Symptom,
        HandlerKind::Medication,
        HandlerKind::Lifestyle,
        HandlerKind::Fallback,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Symptom => "symptom",
            Self::Medication => "medication",
            Self::Lifestyle => "lifestyle",
            Self::Fallback => "fallback",
            Self::System => "system",
        }
    }

    pub fn is_routable(&self) -> bool {
        !matches!(self, Self::System)
    }

    /// Parse a routing target tag (case-insensitive, surrounding whitespace
    /// ignored). `system` and anything unknown yield `None`.
    pub fn parse_routable(tag: &str) -> Option<Self> {
        tag.trim()
            .to_ascii_lowercase()
            .parse::<Self>()
            .ok()
            .filter(Self::is_routable)
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HandlerKind {
    type Err = UnknownHandler;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "symptom" => Ok(Self::Symptom),
            "medication" => Ok(Self::Medication),
            "lifestyle" => Ok(Self::Lifestyle),
            "fallback" => Ok(Self::Fallback),
            "system" => Ok(Self::System),
            other => Err(UnknownHandler(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for kind in HandlerKind::ROUTABLE {
            assert_eq!(kind.as_str().parse::<HandlerKind>().unwrap(), kind);
        }
        assert_eq!("system".parse::<HandlerKind>().unwrap(), HandlerKind::System);
    }

    #[test]
    fn parse_routable_is_case_insensitive() {
        assert_eq!(HandlerKind::parse_routable("SYMPTOM"), Some(HandlerKind::Symptom));
        assert_eq!(HandlerKind::parse_routable("  Lifestyle "), Some(HandlerKind::Lifestyle));
    }

    #[test]
    fn parse_routable_rejects_system_and_unknown() {
        assert_eq!(HandlerKind::parse_routable("system"), None);
        assert_eq!(HandlerKind::parse_routable("cardiology"), None);
        assert_eq!(HandlerKind::parse_routable(""), None);
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&HandlerKind::Medication).unwrap();
        assert_eq!(json, "\"medication\"");
    }
}

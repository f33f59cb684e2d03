//! Routing: decide which specialist agent handles a message.
//!
//! The external decision call is opaque; everything it returns is
//! validated here, and the symptom-priority override is applied
//! afterwards, never delegated to the model.

pub mod engine;
pub mod signals;

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{HandlerKind, RoutingMetadata};
use crate::pipeline::llm::{LlmError, LlmGenerate};

pub use engine::RoutingDecisionEngine;

/// Reply of the decision call before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDecision {
    pub target: String,
    pub reasoning: String,
    pub confidence: Option<f64>,
}

/// Validated routing decision. `target` is always routable and
/// `confidence` always within [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub target: HandlerKind,
    pub reasoning: String,
    pub confidence: f64,
    /// The decision call failed or returned something unusable.
    pub degraded: bool,
    /// The symptom-priority override replaced the proposed target.
    pub overridden: bool,
}

impl RoutingDecision {
    /// Fallback decision recorded when the decision call cannot be used.
    pub fn degraded(reasoning: impl Into<String>) -> Self {
        Self {
            target: HandlerKind::Fallback,
            reasoning: reasoning.into(),
            confidence: 0.0,
            degraded: true,
            overridden: false,
        }
    }

    pub fn metadata(&self) -> RoutingMetadata {
        RoutingMetadata {
            target: self.target,
            reasoning: self.reasoning.clone(),
            confidence: self.confidence,
        }
    }
}

/// The external generative-decision collaborator.
pub trait DecisionSource: Send + Sync {
    fn decide(&self, prompt: &str) -> Result<RawDecision, LlmError>;
}

// ═══════════════════════════════════════════════════════════
// Model-backed decision source
// ═══════════════════════════════════════════════════════════

/// System instruction for the routing call.
pub const ROUTER_SYSTEM_PROMPT: &str = r#"You are a healthcare query router. Decide which specialist agent should handle the user's query.

Agents:
1. SYMPTOM - symptoms, their severity, when to seek care, pain and physical sensations.
2. MEDICATION - medications, dosages, interactions, side effects, prescriptions, and follow-up questions (which specialist, booking) after a medication discussion.
3. LIFESTYLE - diet, exercise, sleep, stress, nutrition and daily routines.
4. FALLBACK - greetings, general or unclear questions, non-health topics, and appointment requests with no prior health discussion.

Rules:
- A query mentioning both symptoms and medication goes to SYMPTOM.
- Medication side effects that cause symptoms go to SYMPTOM.
- "Which specialist should I see" or "book an appointment" follow-ups go to the agent that handled the previous query; with no prior context they go to FALLBACK.

Respond with JSON only, no other text:
{"target_agent": "SYMPTOM|MEDICATION|LIFESTYLE|FALLBACK", "reasoning": "brief explanation", "confidence": 0.0-1.0}"#;

/// Runs the routing prompt through a generator and parses its JSON reply.
pub struct LlmDecisionSource {
    generator: Arc<dyn LlmGenerate>,
}

impl LlmDecisionSource {
    pub fn new(generator: Arc<dyn LlmGenerate>) -> Self {
        Self { generator }
    }
}

impl DecisionSource for LlmDecisionSource {
    fn decide(&self, prompt: &str) -> Result<RawDecision, LlmError> {
        let reply = self.generator.generate(ROUTER_SYSTEM_PROMPT, prompt)?;
        parse_decision(&reply)
    }
}

/// Fixed decision, for tests and offline runs. Records received prompts.
pub struct StaticDecision {
    result: Result<RawDecision, LlmError>,
    prompts: Mutex<Vec<String>>,
}

impl StaticDecision {
    pub fn new(target: &str, reasoning: &str, confidence: Option<f64>) -> Self {
        Self::from_result(Ok(RawDecision {
            target: target.to_string(),
            reasoning: reasoning.to_string(),
            confidence,
        }))
    }

    pub fn failing(error: LlmError) -> Self {
        Self::from_result(Err(error))
    }

    fn from_result(result: Result<RawDecision, LlmError>) -> Self {
        Self {
            result,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl DecisionSource for StaticDecision {
    fn decide(&self, prompt: &str) -> Result<RawDecision, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.result.clone()
    }
}

/// Parse a decision reply. Tolerates Markdown code fences and prose
/// around the JSON object; accepts `target_agent` or `target_handler`.
pub fn parse_decision(reply: &str) -> Result<RawDecision, LlmError> {
    let body = strip_code_fence(reply);
    let json = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => {
            return Err(LlmError::ResponseParsing(
                "no JSON object in routing reply".into(),
            ))
        }
    };

    let value: Value =
        serde_json::from_str(json).map_err(|e| LlmError::ResponseParsing(e.to_string()))?;

    let target = value
        .get("target_agent")
        .or_else(|| value.get("target_handler"))
        .and_then(Value::as_str)
        .ok_or_else(|| LlmError::ResponseParsing("routing reply has no target".into()))?
        .to_string();

    let reasoning = value
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    let confidence = match value.get("confidence") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    Ok(RawDecision {
        target,
        reasoning,
        confidence,
    })
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let inner = if let Some((_, rest)) = trimmed.split_once("```json") {
        rest
    } else if let Some((_, rest)) = trimmed.split_once("```") {
        rest
    } else {
        return trimmed;
    };
    inner.split("```").next().unwrap_or(inner).trim()
}

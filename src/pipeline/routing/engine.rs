use std::sync::Arc;
use std::time::Duration;

use super::signals::requires_symptom_priority;
use super::{DecisionSource, RawDecision, RoutingDecision};
use crate::models::HandlerKind;
use crate::pipeline::context::ContextWindow;
use crate::pipeline::run_blocking_with_timeout;

/// Confidence recorded when the override fires on a decision whose own
/// confidence cannot be trusted.
const OVERRIDE_CONFIDENCE: f64 = 0.9;

/// Picks the handler for each message.
pub struct RoutingDecisionEngine {
    source: Arc<dyn DecisionSource>,
    timeout: Duration,
    context_turns: usize,
}

impl RoutingDecisionEngine {
    pub fn new(source: Arc<dyn DecisionSource>, timeout: Duration, context_turns: usize) -> Self {
        Self {
            source,
            timeout,
            context_turns,
        }
    }

    /// Route `message`. Never fails: an unusable decision call degrades to
    /// `fallback` with confidence 0.0 and a diagnostic reasoning string.
    pub async fn decide(&self, message: &str, window: &ContextWindow) -> RoutingDecision {
        let prompt = self.build_prompt(message, window);
        let source = self.source.clone();

        let (decision, confidence_trusted) =
            match run_blocking_with_timeout(self.timeout, move || source.decide(&prompt)).await {
                None => {
                    tracing::warn!(
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Routing call timed out"
                    );
                    (
                        RoutingDecision::degraded(format!(
                            "Routing call timed out after {}ms; defaulted to fallback",
                            self.timeout.as_millis()
                        )),
                        false,
                    )
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Routing call failed");
                    (
                        RoutingDecision::degraded(format!(
                            "Routing call failed: {e}; defaulted to fallback"
                        )),
                        false,
                    )
                }
                Some(Ok(raw)) => validate(raw),
            };

        let decision = apply_safety_override(message, decision, confidence_trusted);
        tracing::info!(
            target_handler = %decision.target,
            confidence = decision.confidence,
            degraded = decision.degraded,
            overridden = decision.overridden,
            "Routing decision"
        );
        decision
    }

    /// Routing prompt: previous handler, recent transcript, then the query.
    pub fn build_prompt(&self, message: &str, window: &ContextWindow) -> String {
        let mut prompt = String::new();
        if let Some(last) = window.last_handler() {
            prompt.push_str(&format!(
                "Previous message context: the user's last query was handled by the {} agent.\n\n",
                last.as_str().to_uppercase()
            ));
        }
        let transcript = window.render(self.context_turns);
        if !transcript.is_empty() {
            prompt.push_str("Recent conversation:\n");
            prompt.push_str(&transcript);
            prompt.push('\n');
        }
        prompt.push_str("Route this query: ");
        prompt.push_str(message.trim());
        prompt
    }
}

/// Check a raw decision. Returns the decision and whether its confidence
/// came from the model as a usable number.
fn validate(raw: RawDecision) -> (RoutingDecision, bool) {
    let Some(target) = HandlerKind::parse_routable(&raw.target) else {
        tracing::warn!(target_tag = %raw.target, "Routing call returned an invalid target");
        return (
            RoutingDecision::degraded(format!(
                "Routing call returned invalid target '{}'; defaulted to fallback",
                raw.target
            )),
            false,
        );
    };

    let mut reasoning = if raw.reasoning.trim().is_empty() {
        "No reasoning provided".to_string()
    } else {
        raw.reasoning
    };

    let (confidence, trusted) = match raw.confidence {
        Some(c) if c.is_finite() => (c.clamp(0.0, 1.0), true),
        _ => {
            reasoning.push_str(" [confidence missing or invalid; recorded as 0.0]");
            (0.0, false)
        }
    };

    (
        RoutingDecision {
            target,
            reasoning,
            confidence,
            degraded: false,
            overridden: false,
        },
        trusted,
    )
}

/// Force `symptom` when the message carries both symptom and medication
/// signals. No other category is ever overridden.
fn apply_safety_override(
    message: &str,
    mut decision: RoutingDecision,
    confidence_trusted: bool,
) -> RoutingDecision {
    if decision.target == HandlerKind::Symptom || !requires_symptom_priority(message) {
        return decision;
    }

    tracing::info!(proposed = %decision.target, "Safety override: routing to symptom");
    decision.reasoning = format!(
        "{} [safety override: symptom and medication signals both present; proposed '{}' replaced by 'symptom']",
        decision.reasoning, decision.target
    );
    if !confidence_trusted || decision.degraded {
        decision.confidence = OVERRIDE_CONFIDENCE;
    }
    decision.target = HandlerKind::Symptom;
    decision.overridden = true;
    decision
}

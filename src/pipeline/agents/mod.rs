//! Specialist agents: one generator per handler category, each held to a
//! fixed boundary policy.

pub mod boundary;
pub mod prompts;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Map;

use crate::models::{HandlerKind, Turn};
use crate::pipeline::context::ContextWindow;
use crate::pipeline::llm::{LlmError, LlmGenerate};
use crate::pipeline::routing::RoutingDecision;
use crate::pipeline::run_blocking_with_timeout;

pub use boundary::{find_dose_directive, DoseDirective, SAFE_DEFERRAL};

/// Reply shown whenever a response cannot be generated.
pub const APOLOGY: &str =
    "I apologize, but I encountered an error processing your request. Please try again.";

const BOOKING_PHRASE: &str = "book an appointment";

/// Routes a decision to the matching agent and records the turn.
pub struct SpecialistAgentDispatch {
    symptom: Arc<dyn LlmGenerate>,
    medication: Arc<dyn LlmGenerate>,
    lifestyle: Arc<dyn LlmGenerate>,
    fallback: Arc<dyn LlmGenerate>,
    timeout: Duration,
    context_turns: usize,
}

impl SpecialistAgentDispatch {
    pub fn new(
        symptom: Arc<dyn LlmGenerate>,
        medication: Arc<dyn LlmGenerate>,
        lifestyle: Arc<dyn LlmGenerate>,
        fallback: Arc<dyn LlmGenerate>,
        timeout: Duration,
        context_turns: usize,
    ) -> Self {
        Self {
            symptom,
            medication,
            lifestyle,
            fallback,
            timeout,
            context_turns,
        }
    }

    /// All four agents share one generator (they differ by system prompt).
    pub fn single(
        generator: Arc<dyn LlmGenerate>,
        timeout: Duration,
        context_turns: usize,
    ) -> Self {
        Self::new(
            generator.clone(),
            generator.clone(),
            generator.clone(),
            generator,
            timeout,
            context_turns,
        )
    }

    fn generator_for(&self, kind: HandlerKind) -> Arc<dyn LlmGenerate> {
        match kind {
            HandlerKind::Symptom => self.symptom.clone(),
            HandlerKind::Medication => self.medication.clone(),
            HandlerKind::Lifestyle => self.lifestyle.clone(),
            HandlerKind::Fallback | HandlerKind::System => self.fallback.clone(),
        }
    }

    pub fn build_prompt(&self, message: &str, window: &ContextWindow) -> String {
        let mut prompt = String::new();
        let history = window.render(self.context_turns);
        if !history.is_empty() {
            prompt.push_str("Conversation history:\n");
            prompt.push_str(&history);
            prompt.push('\n');
        }
        prompt.push_str(&format!("User: {}\n\nAssistant:", message.trim()));
        prompt
    }

    /// Generate the reply for `decision`, append the resulting turn to
    /// `window` and return it. Never fails: any generation problem yields
    /// the apology with confidence 0.
    pub async fn respond(
        &self,
        decision: &RoutingDecision,
        message: &str,
        window: &mut ContextWindow,
    ) -> Turn {
        let kind = decision.target;
        let mut metadata = Map::new();

        let (response, confidence, degraded) = if decision.degraded {
            // The decision call already failed; the same service backs the agents.
            metadata.insert("error".into(), decision.reasoning.clone().into());
            (APOLOGY.to_string(), 0.0, true)
        } else {
            match self.generate(kind, message, window).await {
                Ok(text) => match guard(kind, &text) {
                    Some(directive) => {
                        tracing::warn!(
                            handler = %kind,
                            matched = %directive.matched_text,
                            "Reply crossed the dosage boundary; replaced with deferral"
                        );
                        metadata.insert("boundary_violation".into(), directive.description.into());
                        (SAFE_DEFERRAL.to_string(), 1.0, true)
                    }
                    None => (text, 1.0, false),
                },
                Err(e) => {
                    tracing::warn!(handler = %kind, error = %e, "Agent call failed");
                    metadata.insert("error".into(), e.to_string().into());
                    (APOLOGY.to_string(), 0.0, true)
                }
            }
        };

        if suggests_booking(&response) {
            metadata.insert("booking_suggested".into(), true.into());
        }

        let turn = Turn {
            user_text: message.to_string(),
            handler: kind,
            response,
            routing: decision.metadata(),
            confidence,
            degraded,
            metadata,
            created_at: Utc::now(),
        };
        window.append(turn.clone());
        turn
    }

    async fn generate(
        &self,
        kind: HandlerKind,
        message: &str,
        window: &ContextWindow,
    ) -> Result<String, LlmError> {
        let prompt = self.build_prompt(message, window);
        let generator = self.generator_for(kind);
        let system = prompts::system_prompt(kind);

        let text =
            run_blocking_with_timeout(self.timeout, move || generator.generate(system, &prompt))
                .await
                .unwrap_or(Err(LlmError::Timeout(self.timeout.as_secs())))?;

        let text = text.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}

/// Symptom and medication replies must never alter a dose.
fn guard(kind: HandlerKind, text: &str) -> Option<DoseDirective> {
    match kind {
        HandlerKind::Symptom | HandlerKind::Medication => find_dose_directive(text),
        _ => None,
    }
}

/// Whether a reply invites the user to book, which the chat page turns
/// into a booking button.
pub fn suggests_booking(response: &str) -> bool {
    response.to_lowercase().contains(BOOKING_PHRASE)
}

//! Generative text capability and its implementations.
//!
//! All callers go through [`LlmGenerate`], so routing and agent code can
//! be exercised with [`MockGenerator`] instead of live network calls.

pub mod gemini;

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;

pub use gemini::GeminiClient;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("Generative model not configured (GEMINI_API_KEY missing)")]
    NotConfigured,

    #[error("Connection to generative API failed: {0}")]
    Connection(String),

    #[error("Generative call timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Generative API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Empty response from generative model")]
    EmptyResponse,

    #[error("Generative task failed: {0}")]
    TaskFailed(String),
}

/// Synchronous text generation: system instruction plus user prompt in,
/// model text out.
pub trait LlmGenerate: Send + Sync {
    fn generate(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

/// Stand-in used when no API key is configured. Every call fails, so each
/// turn degrades gracefully instead of the service refusing to start.
pub struct UnconfiguredGenerator;

impl LlmGenerate for UnconfiguredGenerator {
    fn generate(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::NotConfigured)
    }
}

/// What a [`MockGenerator`] does when called.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    Reply(String),
    Fail(LlmError),
    /// Sleep, then reply. Used to trip caller-side timeouts.
    Slow(Duration, String),
}

/// Deterministic generator for tests and offline runs.
///
/// Replies from a queue of scripted behaviors, repeating the last one, and
/// records every prompt it receives.
pub struct MockGenerator {
    script: Mutex<VecDeque<MockBehavior>>,
    last: Mutex<MockBehavior>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockGenerator {
    pub fn new(response: &str) -> Self {
        Self::scripted(vec![MockBehavior::Reply(response.to_string())])
    }

    pub fn failing(error: LlmError) -> Self {
        Self::scripted(vec![MockBehavior::Fail(error)])
    }

    pub fn slow(delay: Duration, response: &str) -> Self {
        Self::scripted(vec![MockBehavior::Slow(delay, response.to_string())])
    }

    pub fn scripted(behaviors: Vec<MockBehavior>) -> Self {
        let last = behaviors
            .last()
            .cloned()
            .unwrap_or(MockBehavior::Fail(LlmError::EmptyResponse));
        Self {
            script: Mutex::new(behaviors.into()),
            last: Mutex::new(last),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(system, prompt)` pairs received so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn next_behavior(&self) -> MockBehavior {
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(behavior) => {
                if let Ok(mut last) = self.last.lock() {
                    *last = behavior.clone();
                }
                behavior
            }
            None => self
                .last
                .lock()
                .map(|l| l.clone())
                .unwrap_or(MockBehavior::Fail(LlmError::EmptyResponse)),
        }
    }
}

impl LlmGenerate for MockGenerator {
    fn generate(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((system.to_string(), prompt.to_string()));
        }
        match self.next_behavior() {
            MockBehavior::Reply(text) => Ok(text),
            MockBehavior::Fail(e) => Err(e),
            MockBehavior::Slow(delay, text) => {
                std::thread::sleep(delay);
                Ok(text)
            }
        }
    }
}

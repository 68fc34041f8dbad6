//! Stub Adapter
//!
//! Scripted adapter that returns canned responses without network calls.
//! Used for integration tests and when no LLM is configured.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::llm::adapters::{AdapterError, LlmAdapter};

const DEFAULT_RESPONSE: &str = "stub response";

/// Stub adapter for testing (returns scripted responses)
#[derive(Debug, Default)]
pub struct StubAdapter {
    /// Replies consumed in order; `Err` entries fail that call
    script: Mutex<VecDeque<Result<String, String>>>,
    /// Reply once the script is exhausted
    fallback: Option<String>,
    /// Every prompt received, in order
    prompts: Mutex<Vec<String>>,
}

impl StubAdapter {
    /// Create new stub adapter with default fake response
    pub fn new() -> Self {
        Self::with_response(DEFAULT_RESPONSE)
    }

    /// Stub that always returns `response`
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            fallback: Some(response.into()),
            ..Self::default()
        }
    }

    /// Stub that returns `responses` in order, then fails
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(responses.into_iter().map(|r| Ok(r.into())).collect()),
            ..Self::default()
        }
    }

    /// Queue one more successful reply
    pub fn push_response(&self, response: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Ok(response.into()));
        }
    }

    /// Queue a failing reply (surfaces as a transport-level error)
    pub fn push_error(&self, message: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(message.into()));
        }
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }
}

impl LlmAdapter for StubAdapter {
    fn generate(&self, prompt: &str, _max_tokens: u32) -> Result<String, AdapterError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let next = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front());

        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(AdapterError::Transport(
                crate::http::TransportError::Network(message),
            )),
            None => self.fallback.clone().ok_or_else(|| {
                AdapterError::InvalidResponse("stub script exhausted".to_string())
            }),
        }
    }

    fn provider_name(&self) -> &str {
        "stub"
    }

    fn model(&self) -> &str {
        "stub-model"
    }
}

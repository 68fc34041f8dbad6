//! LLM Adapters
//!
//! Provider-agnostic interface for text-generation HTTP APIs.
//! Supports Anthropic (messages API), OpenAI-compatible chat completions,
//! and a scripted stub for offline runs and tests.

pub mod anthropic;
pub mod factory;
pub mod openai;
pub mod stub;

use crate::http::TransportError;

pub use anthropic::AnthropicAdapter;
pub use factory::create_adapter;
pub use openai::OpenAiAdapter;
pub use stub::StubAdapter;

/// Adapter errors
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// Transport failure (network, auth, rate limit, HTTP status)
    #[error("LLM request failed: {0}")]
    Transport(#[from] TransportError),

    /// Response did not have the expected shape
    #[error("Invalid LLM response: {0}")]
    InvalidResponse(String),

    /// Adapter could not be built from configuration
    #[error("LLM configuration error: {0}")]
    Configuration(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// LLM adapter trait
///
/// All providers implement this trait. The session and the plan generator
/// only ever call through it.
pub trait LlmAdapter: Send + Sync {
    /// Submit a single user prompt and return the full response text
    fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, AdapterError>;

    /// Provider name for logging and status output
    fn provider_name(&self) -> &str;

    fn model(&self) -> &str;
}

/// Adapter enum: concrete type for all providers
///
/// Lets the CLI pick a provider from configuration while the session stays
/// generic over [`LlmAdapter`].
#[derive(Debug)]
pub enum Adapter {
    Anthropic(AnthropicAdapter),
    OpenAi(OpenAiAdapter),
    Stub(StubAdapter),
}

impl LlmAdapter for Adapter {
    fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, AdapterError> {
        match self {
            Adapter::Anthropic(a) => a.generate(prompt, max_tokens),
            Adapter::OpenAi(a) => a.generate(prompt, max_tokens),
            Adapter::Stub(a) => a.generate(prompt, max_tokens),
        }
    }

    fn provider_name(&self) -> &str {
        match self {
            Adapter::Anthropic(a) => a.provider_name(),
            Adapter::OpenAi(a) => a.provider_name(),
            Adapter::Stub(a) => a.provider_name(),
        }
    }

    fn model(&self) -> &str {
        match self {
            Adapter::Anthropic(a) => a.model(),
            Adapter::OpenAi(a) => a.model(),
            Adapter::Stub(a) => a.model(),
        }
    }
}

impl<T: LlmAdapter + ?Sized> LlmAdapter for &T {
    fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, AdapterError> {
        (**self).generate(prompt, max_tokens)
    }

    fn provider_name(&self) -> &str {
        (**self).provider_name()
    }

    fn model(&self) -> &str {
        (**self).model()
    }
}

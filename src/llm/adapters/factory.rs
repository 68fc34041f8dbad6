//! Adapter Factory
//!
//! Creates LLM adapter instances from the `[llm]` configuration section.

use crate::config::{LlmSettings, Provider};
use crate::llm::adapters::anthropic::{self, AnthropicAdapter};
use crate::llm::adapters::openai::{self, OpenAiAdapter};
use crate::llm::adapters::stub::StubAdapter;
use crate::llm::adapters::{Adapter, AdapterError};

/// Build the configured adapter
pub fn create_adapter(settings: &LlmSettings) -> Result<Adapter, AdapterError> {
    if settings.provider == Provider::Stub {
        return Ok(Adapter::Stub(StubAdapter::new()));
    }

    let api_key = settings
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            AdapterError::Configuration(format!(
                "Missing 'api_key' for provider {}",
                settings.provider
            ))
        })?;

    let adapter = match settings.provider {
        Provider::Anthropic => Adapter::Anthropic(AnthropicAdapter::new(
            base_url_or(settings, anthropic::DEFAULT_BASE_URL),
            settings.model.clone(),
            api_key,
            settings.timeout_secs,
        )),
        Provider::OpenAi => Adapter::OpenAi(OpenAiAdapter::new(
            base_url_or(settings, openai::DEFAULT_BASE_URL),
            settings.model.clone(),
            api_key,
            settings.timeout_secs,
        )),
        Provider::Stub => Adapter::Stub(StubAdapter::new()),
    };

    tracing::debug!(
        provider = %settings.provider,
        model = %settings.model,
        "llm adapter created"
    );
    Ok(adapter)
}

fn base_url_or(settings: &LlmSettings, default: &str) -> String {
    settings
        .base_url
        .clone()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

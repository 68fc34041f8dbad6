//! Anthropic Adapter
//!
//! Messages API (`POST /v1/messages`), single user turn, non-streaming.

use serde_json::Value as JsonValue;

use crate::http::{SyncTransport, Transport};
use crate::llm::adapters::{AdapterError, LlmAdapter};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Anthropic messages adapter
#[derive(Debug)]
pub struct AnthropicAdapter {
    /// Base URL (e.g., https://api.anthropic.com)
    base_url: String,
    /// Model name (e.g., claude-sonnet-4-20250514)
    model: String,
    api_key: String,
    transport: Transport,
}

impl AnthropicAdapter {
    pub fn new(base_url: String, model: String, api_key: String, timeout_secs: u64) -> Self {
        Self {
            base_url,
            model,
            api_key,
            transport: Transport::real(timeout_secs),
        }
    }

    /// Create adapter with custom transport (for testing)
    pub fn with_transport(
        base_url: String,
        model: String,
        api_key: String,
        transport: Transport,
    ) -> Self {
        Self {
            base_url,
            model,
            api_key,
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    fn build_request(&self, prompt: &str, max_tokens: u32) -> String {
        serde_json::json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "messages": [
                {"role": "user", "content": prompt}
            ]
        })
        .to_string()
    }
}

/// Extract the concatenated text blocks of a messages API response
///
/// Public function for testing.
pub fn parse_messages_response(response: &str) -> Result<String, AdapterError> {
    let json: JsonValue = serde_json::from_str(response)?;

    let blocks = json["content"].as_array().ok_or_else(|| {
        AdapterError::InvalidResponse("Missing content array".to_string())
    })?;

    let text: Vec<&str> = blocks
        .iter()
        .filter(|b| b.get("type").and_then(|t| t.as_str()).unwrap_or("text") == "text")
        .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.is_empty() {
        return Err(AdapterError::InvalidResponse(
            "Missing content[].text".to_string(),
        ));
    }

    Ok(text.concat())
}

impl LlmAdapter for AnthropicAdapter {
    fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, AdapterError> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let body = self.build_request(prompt, max_tokens);

        let headers = [
            ("x-api-key", self.api_key.as_str()),
            ("anthropic-version", API_VERSION),
            ("Content-Type", "application/json"),
        ];

        tracing::debug!(model = %self.model, max_tokens, "anthropic request");
        let response = self.transport.post_json(&url, &headers, &body)?;
        parse_messages_response(&response)
    }

    fn provider_name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

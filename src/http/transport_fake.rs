//! Fake transport for testing
//!
//! Uses fixture strings instead of real HTTP calls and records every request.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::http::transport_types::{SyncTransport, TransportError};

/// A request captured by [`FakeTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Fake transport for testing (uses fixture strings)
#[derive(Debug, Default)]
pub struct FakeTransport {
    /// Responses returned in order; the last one repeats once the queue drains
    responses: Mutex<VecDeque<String>>,
    /// Response returned when the queue is empty
    response_body: String,
    /// Error message to return (if set)
    error_message: Option<String>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeTransport {
    /// Create fake transport with given response
    pub fn new(response: &str) -> Self {
        Self {
            response_body: response.to_string(),
            ..Self::default()
        }
    }

    /// Create fake transport returning `responses` in order, then the last one
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queue: VecDeque<String> = responses.into_iter().map(Into::into).collect();
        let response_body = queue.back().cloned().unwrap_or_default();
        Self {
            responses: Mutex::new(queue),
            response_body,
            ..Self::default()
        }
    }

    /// Create fake transport that returns a network error
    pub fn with_error(msg: &str) -> Self {
        Self {
            error_message: Some(msg.to_string()),
            ..Self::default()
        }
    }

    /// Requests seen so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl SyncTransport for FakeTransport {
    fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> Result<String, TransportError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                url: url.to_string(),
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                body: body.to_string(),
            });
        }

        if let Some(ref msg) = self.error_message {
            return Err(TransportError::Network(msg.clone()));
        }

        let queued = self
            .responses
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front());
        Ok(queued.unwrap_or_else(|| self.response_body.clone()))
    }
}

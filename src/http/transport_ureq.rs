//! Blocking HTTPS transport on a shared `ureq::Agent`
//!
//! One agent per transport so connections to the same workspace or LLM
//! endpoint are pooled across statements and turns.

use std::fmt;
use std::io::Read;
use std::time::Duration;

use crate::http::transport_types::{SyncTransport, TransportError};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Bodies larger than this are refused rather than buffered
const MAX_BODY_BYTES: u64 = 16 * 1024 * 1024;

pub struct UreqTransport {
    agent: ureq::Agent,
    timeout_secs: u64,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Overall per-request timeout; connecting is capped separately
    pub fn with_timeout(timeout_secs: u64) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(CONNECT_TIMEOUT_SECS.min(timeout_secs.max(1))))
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .user_agent(concat!("medallion/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            timeout_secs,
        }
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport")
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl SyncTransport for UreqTransport {
    fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> Result<String, TransportError> {
        let request = headers
            .iter()
            .fold(self.agent.post(url), |req, (name, value)| req.set(name, value))
            .set("Content-Type", "application/json");

        tracing::debug!(url, bytes = body.len(), "http request");
        // 4xx/5xx come back as ureq::Error::Status; see From<ureq::Error>
        let response = request.send_string(body)?;
        let status = response.status();

        let mut text = String::new();
        response
            .into_reader()
            .take(MAX_BODY_BYTES)
            .read_to_string(&mut text)?;
        tracing::debug!(status, bytes = text.len(), "http response");
        Ok(text)
    }
}

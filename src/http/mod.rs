//! HTTP transport shared by the LLM adapters and the Databricks warehouse
//!
//! Provides synchronous HTTP client behind [`SyncTransport`].
//! Uses ureq for blocking I/O.

pub mod transport_fake;
pub mod transport_types;
pub mod transport_ureq;

pub use transport_fake::{FakeTransport, RecordedRequest};
pub use transport_types::{truncate, SyncTransport, TransportError};
pub use transport_ureq::UreqTransport;

/// Concrete transport enum
///
/// Wraps all transport types, avoiding dyn compatibility issues.
#[derive(Debug)]
pub enum Transport {
    Real(UreqTransport),
    Fake(FakeTransport),
}

impl Transport {
    /// Real transport with the given request timeout
    pub fn real(timeout_secs: u64) -> Self {
        Transport::Real(UreqTransport::with_timeout(timeout_secs))
    }

    /// Borrow the fake transport, if this is one (test inspection)
    pub fn as_fake(&self) -> Option<&FakeTransport> {
        match self {
            Transport::Fake(t) => Some(t),
            Transport::Real(_) => None,
        }
    }
}

impl SyncTransport for Transport {
    fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> Result<String, TransportError> {
        match self {
            Transport::Real(t) => t.post_json(url, headers, body),
            Transport::Fake(t) => t.post_json(url, headers, body),
        }
    }
}

impl Default for Transport {
    fn default() -> Self {
        Transport::Real(UreqTransport::new())
    }
}

//! Transport types
//!
//! Common types shared across transport implementations.

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Network error (connection refused, timeout, etc.)
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP error (non-2xx status)
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    /// Authentication failed (401/403)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limited
    #[error("Rate limited{retry_after}")]
    RateLimited { retry_after: String },

    /// IO error while reading the body
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}

impl From<ureq::Error> for TransportError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, response) => {
                let retry_after = response
                    .header("retry-after")
                    .map(|s| format!(" (retry after {}s)", s))
                    .unwrap_or_default();
                let body = response.into_string().unwrap_or_default();
                match code {
                    401 | 403 => TransportError::Authentication(truncate(&body, 200)),
                    429 => TransportError::RateLimited { retry_after },
                    _ => TransportError::Http {
                        status: code,
                        message: truncate(&body, 500),
                    },
                }
            }
            ureq::Error::Transport(err) => TransportError::Network(err.to_string()),
        }
    }
}

/// Trim and cut `text` to at most `max_chars` characters, marking the cut with `...`
pub fn truncate(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

/// Synchronous HTTP transport
///
/// Abstraction over HTTP client to enable testing with FakeTransport.
pub trait SyncTransport: Send + Sync {
    /// POST JSON request and return response body
    fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> Result<String, TransportError>;
}

//! Fetch error taxonomy
//!
//! Every network operation in the pipeline fails with a [`FetchError`]. The
//! retry loop only looks at [`FetchError::is_transient`]; adapters turn any
//! error into "no data" after logging it.

use super::redact_text;
use thiserror::Error;

/// Errors raised by the resilient fetch pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Relay answered 2xx with an HTML page (usually its own error page)
    #[error("Expected JSON, received an HTML page")]
    HtmlPayload,

    /// Body is not JSON, the envelope could not be unwrapped, or the payload
    /// has none of the recognized shapes
    #[error("Malformed payload: {0}")]
    Malformed(String),

    /// Every relay in the chain was abandoned
    #[error("{}", relay_failure_message(*.relays, .last.as_deref()))]
    AllRelaysFailed {
        relays: usize,
        last: Option<Box<FetchError>>,
    },
}

impl FetchError {
    /// Transient conditions are retried; everything else ends the attempt path
    ///
    /// Transient: timeout, network error, HTTP 5xx, HTTP 429, HTML payload.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout(_) | FetchError::Network(_) | FetchError::HtmlPayload => true,
            FetchError::Http { status, .. } => *status >= 500 || *status == 429,
            FetchError::Malformed(_) | FetchError::AllRelaysFailed { .. } => false,
        }
    }

    /// Definitive client-side rejection (4xx other than 429)
    pub fn is_client_error(&self) -> bool {
        matches!(self, FetchError::Http { status, .. } if (400..500).contains(status) && *status != 429)
    }

    pub(crate) fn from_status(status: u16, body: String) -> Self {
        // Relays echo the request URL, credential included
        let body = redact_text(&body);
        // Error bodies can be whole HTML pages; keep the log line short
        let body = if body.len() > 200 {
            let mut cut = 200;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}...", &body[..cut])
        } else {
            body
        };
        FetchError::Http { status, body }
    }
}

fn relay_failure_message(relays: usize, last: Option<&FetchError>) -> String {
    match last {
        Some(err) => format!("All {relays} relays failed; last error: {err}"),
        None => format!("All {relays} relays failed"),
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return FetchError::Timeout(0);
        }
        // The request URL may carry the provider credential
        FetchError::Network(err.without_url().to_string())
    }
}

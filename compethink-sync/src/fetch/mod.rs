//! Resilient fetch pipeline
//!
//! - [`retry`]: per-attempt timeout plus exponential backoff on transient errors
//! - [`relay`]: ordered relay fallback for the relay-only provider
//! - [`payload`]: HTML rejection, envelope unwrapping and shape validation

pub mod error;
pub mod payload;
pub mod relay;
pub mod retry;

pub use error::FetchError;
pub use payload::ProviderPayload;
pub use relay::{Relay, RelayChain};
pub use retry::{attempt, RetryPolicy};

use std::time::Duration;

const USER_AGENT: &str = concat!("compethink/", env!("CARGO_PKG_VERSION"));

/// Query parameters that carry provider credentials
const SECRET_PARAMS: [&str; 2] = ["api_key", "key"];

/// Shared HTTP client for all providers
///
/// Per-request bounds come from each [`RetryPolicy`]; `ceiling` is only a
/// backstop for requests made outside of [`attempt`].
pub fn build_http_client(ceiling: Duration) -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(ceiling)
        .build()
        .map_err(|e| FetchError::Network(e.to_string()))
}

/// Copy of `url` with credential query parameters masked, for logging
pub fn redact_url(url: &str) -> String {
    let Ok(mut parsed) = reqwest::Url::parse(url) else {
        return "<unparseable url>".to_string();
    };
    if parsed.query().is_none() {
        return parsed.to_string();
    }

    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| {
            let value = if SECRET_PARAMS.contains(&k.as_ref()) {
                "REDACTED".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();

    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    parsed.to_string()
}

/// Copy of free text with credential values masked
///
/// Relays and providers sometimes echo the request URL in error pages, either
/// raw or percent-encoded (once or twice, depending on the relay).
pub fn redact_text(text: &str) -> String {
    let markers: Vec<String> = SECRET_PARAMS
        .iter()
        .flat_map(|p| [format!("{p}="), format!("{p}%3d"), format!("{p}%253d")])
        .collect();
    // ASCII lowercasing keeps byte offsets aligned with `text`
    let lower = text.to_ascii_lowercase();

    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    while let Some((start, len)) = markers
        .iter()
        .filter_map(|m| lower[pos..].find(m.as_str()).map(|i| (pos + i, m.len())))
        .min_by_key(|&(start, _)| start)
    {
        let value_start = start + len;
        let value_len = text[value_start..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || "-_.~".contains(c)))
            .unwrap_or(text.len() - value_start);
        out.push_str(&text[pos..value_start]);
        if value_len > 0 {
            out.push_str("REDACTED");
        }
        pos = value_start + value_len;
    }
    out.push_str(&text[pos..]);
    out
}

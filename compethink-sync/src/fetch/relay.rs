//! Relay fallback chain
//!
//! The SEO-metrics provider is only reachable through public relays. Each
//! relay gets its own retry budget; a relay that keeps failing, or that
//! answers with something other than a valid provider payload, is abandoned
//! for the next one. When every relay is abandoned the chain fails with
//! [`FetchError::AllRelaysFailed`] carrying the last observed error.

use super::payload::{validate_body, ProviderPayload};
use super::{attempt, redact_url, FetchError, RetryPolicy};
use compethink_common::config::RelayConfig;
use reqwest::header::ACCEPT;
use std::time::{SystemTime, UNIX_EPOCH};

/// One public relay endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relay {
    name: String,
    template: String,
}

impl Relay {
    /// Build a relay from a URL template
    ///
    /// `{url}` is replaced by the percent-encoded target and `{nonce}` by a
    /// cache-busting timestamp.
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let name = reqwest::Url::parse(&template.replace("{url}", "").replace("{nonce}", ""))
            .ok()
            .and_then(|u| {
                let host = u.host_str()?.to_string();
                Some(match u.port() {
                    Some(port) => format!("{host}:{port}"),
                    None => host,
                })
            })
            .unwrap_or_else(|| template.clone());
        Self { name, template }
    }

    /// Host of the relay, safe to log
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Relay URL that forwards to `target`
    pub fn url_for(&self, target: &str) -> String {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        self.template
            .replace("{url}", &urlencoding::encode(target))
            .replace("{nonce}", &nonce.to_string())
    }
}

/// Ordered relay list sharing one HTTP client and one per-relay retry policy
#[derive(Debug, Clone)]
pub struct RelayChain {
    http_client: reqwest::Client,
    relays: Vec<Relay>,
    policy: RetryPolicy,
}

impl RelayChain {
    pub fn new(http_client: reqwest::Client, relays: Vec<Relay>, policy: RetryPolicy) -> Self {
        Self {
            http_client,
            relays,
            policy,
        }
    }

    pub fn from_config(http_client: reqwest::Client, config: &RelayConfig) -> Self {
        let relays = config.templates.iter().map(Relay::new).collect();
        let policy = RetryPolicy::new(
            config.max_retries,
            config.initial_backoff_ms,
            config.timeout_ms,
        );
        Self::new(http_client, relays, policy)
    }

    pub fn relays(&self) -> &[Relay] {
        &self.relays
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch `target` through the first relay that yields a valid payload
    pub async fn fetch(&self, target: &str) -> Result<ProviderPayload, FetchError> {
        let safe_target = redact_url(target);
        let mut last_error = None;

        for relay in &self.relays {
            let started = std::time::Instant::now();

            // A fresh nonce per attempt keeps relay caches out of retries
            match attempt(relay.name(), &self.policy, || self.fetch_once(relay.url_for(target))).await {
                Ok(payload) => {
                    tracing::debug!(
                        relay = %relay.name(),
                        url = %safe_target,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Relay returned a valid payload"
                    );
                    return Ok(payload);
                }
                Err(err) => {
                    tracing::warn!(
                        relay = %relay.name(),
                        url = %safe_target,
                        error = %err,
                        "Relay abandoned, trying next"
                    );
                    last_error = Some(Box::new(err));
                }
            }
        }

        tracing::error!(url = %safe_target, relays = self.relays.len(), "All relays failed");
        Err(FetchError::AllRelaysFailed {
            relays: self.relays.len(),
            last: last_error,
        })
    }

    async fn fetch_once(&self, url: String) -> Result<ProviderPayload, FetchError> {
        let response = self
            .http_client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::from_status(status.as_u16(), body));
        }

        let body = response.text().await?;
        validate_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_name_is_host() {
        assert_eq!(
            Relay::new("https://api.allorigins.win/get?url={url}&_={nonce}").name(),
            "api.allorigins.win"
        );
        assert_eq!(Relay::new("http://127.0.0.1:8080/r?u={url}").name(), "127.0.0.1:8080");
        assert_eq!(Relay::new("https://corsproxy.io/?{url}").name(), "corsproxy.io");
    }

    #[test]
    fn test_url_for_encodes_target() {
        let relay = Relay::new("https://corsproxy.io/?{url}");
        let url = relay.url_for("https://api.example/v2/?action=metrics&domain=acme.it");
        assert_eq!(
            url,
            "https://corsproxy.io/?https%3A%2F%2Fapi.example%2Fv2%2F%3Faction%3Dmetrics%26domain%3Dacme.it"
        );
    }

    #[test]
    fn test_nonce_is_filled() {
        let relay = Relay::new("https://relay.example/get?url={url}&_={nonce}");
        let url = relay.url_for("x");
        assert!(!url.contains("{nonce}"));
        let nonce = url.rsplit("_=").next().unwrap();
        assert!(nonce.parse::<u128>().is_ok());
    }

    #[test]
    fn test_from_config_uses_relay_policy() {
        let chain = RelayChain::from_config(reqwest::Client::new(), &RelayConfig::default());
        assert_eq!(chain.relays().len(), 3);
        assert_eq!(chain.policy().max_retries, 1);
        assert_eq!(chain.policy().initial_backoff.as_millis(), 1500);
    }

    #[tokio::test]
    async fn test_empty_chain_fails_without_last_error() {
        let chain = RelayChain::new(reqwest::Client::new(), Vec::new(), RetryPolicy::single(100));
        let err = chain.fetch("https://api.example/").await.unwrap_err();
        assert_eq!(err, FetchError::AllRelaysFailed { relays: 0, last: None });
    }
}

//! Page-performance audit client
//!
//! One GET per competitor against a PageSpeed-style endpoint (mobile
//! strategy). Category scores come back in [0, 1] and are scaled to 0-100.
//! A definitive 4xx (other than 429) means the target URL is invalid or
//! unreachable, so the adapter gives up immediately.

use super::{percent, PerformanceProvider};
use crate::fetch::payload::parse_json_body;
use crate::fetch::{attempt, FetchError, RetryPolicy};
use async_trait::async_trait;
use compethink_common::config::TomlConfig;
use serde::Deserialize;

const CATEGORIES: [&str; 4] = ["PERFORMANCE", "SEO", "ACCESSIBILITY", "BEST_PRACTICES"];

/// Audit category scores, each 0-100
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerformanceScores {
    pub performance: u32,
    pub seo: u32,
    pub accessibility: u32,
    pub best_practices: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuditResponse {
    #[serde(default)]
    lighthouse_result: Option<LighthouseResult>,
}

#[derive(Debug, Deserialize)]
struct LighthouseResult {
    #[serde(default)]
    categories: Option<Categories>,
}

#[derive(Debug, Deserialize)]
struct Categories {
    #[serde(default)]
    performance: Option<Category>,
    #[serde(default)]
    seo: Option<Category>,
    #[serde(default)]
    accessibility: Option<Category>,
    #[serde(default, rename = "best-practices")]
    best_practices: Option<Category>,
}

#[derive(Debug, Deserialize)]
struct Category {
    #[serde(default)]
    score: Option<f64>,
}

fn scaled(category: &Option<Category>) -> u32 {
    category
        .as_ref()
        .and_then(|c| c.score)
        .map(|score| percent(score * 100.0))
        .unwrap_or(0)
}

impl Categories {
    fn scores(&self) -> PerformanceScores {
        PerformanceScores {
            performance: scaled(&self.performance),
            seo: scaled(&self.seo),
            accessibility: scaled(&self.accessibility),
            best_practices: scaled(&self.best_practices),
        }
    }
}

/// Page URL audited for a domain as entered by the user
pub fn audit_target(domain: &str) -> String {
    let domain = domain.trim();
    if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    }
}

/// HTTP client for the page-performance audit service
pub struct PerformanceClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    policy: RetryPolicy,
}

impl PerformanceClient {
    pub fn new(
        http_client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            policy,
        }
    }

    pub fn from_config(http_client: reqwest::Client, config: &TomlConfig) -> Self {
        Self::new(
            http_client,
            config.providers.performance_base_url.clone(),
            config.providers.performance_api_key.clone(),
            RetryPolicy::new(
                config.performance.max_retries,
                config.performance.initial_backoff_ms,
                config.performance.timeout_ms,
            ),
        )
    }

    fn request_url(&self, page_url: &str) -> Result<String, FetchError> {
        let mut params: Vec<(&str, &str)> = vec![("url", page_url)];
        params.extend(CATEGORIES.iter().map(|c| ("category", *c)));
        params.push(("strategy", "mobile"));
        if let Some(key) = &self.api_key {
            params.push(("key", key.as_str()));
        }
        reqwest::Url::parse_with_params(&self.base_url, &params)
            .map(|u| u.to_string())
            .map_err(|e| FetchError::Malformed(format!("invalid performance base URL: {e}")))
    }

    /// Run the audit; `Ok(None)` when the response carries no categories
    pub async fn run_audit(&self, target: &str) -> Result<Option<PerformanceScores>, FetchError> {
        let url = self.request_url(&audit_target(target))?;
        attempt("performance audit", &self.policy, || self.fetch_once(&url)).await
    }

    async fn fetch_once(&self, url: &str) -> Result<Option<PerformanceScores>, FetchError> {
        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::from_status(status.as_u16(), body));
        }

        let body = response.text().await?;
        let value = parse_json_body(&body)?;
        let parsed: AuditResponse = serde_json::from_value(value)
            .map_err(|e| FetchError::Malformed(format!("unexpected audit response: {e}")))?;

        Ok(parsed
            .lighthouse_result
            .and_then(|r| r.categories)
            .map(|c| c.scores()))
    }
}

#[async_trait]
impl PerformanceProvider for PerformanceClient {
    async fn audit(&self, target: &str) -> Option<PerformanceScores> {
        match self.run_audit(target).await {
            Ok(Some(scores)) => {
                tracing::info!(
                    page = target,
                    performance = scores.performance,
                    seo = scores.seo,
                    "Performance audit complete"
                );
                Some(scores)
            }
            Ok(None) => {
                tracing::warn!(page = target, "Performance audit returned no categories");
                None
            }
            Err(e) if e.is_client_error() => {
                tracing::warn!(page = target, error = %e, "Performance audit rejected the target");
                None
            }
            Err(e) => {
                tracing::warn!(page = target, error = %e, "Performance audit unavailable");
                None
            }
        }
    }
}

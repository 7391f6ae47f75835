//! SEO-metrics provider client
//!
//! Two endpoints are queried concurrently for a domain:
//! - `action=metrics`: authority, trust, opportunity, stability, site health, traffic
//! - `action=aikeywords`: keywords for which the domain shows up in AI answers
//!
//! The provider returns numbers as numbers or strings depending on the field
//! and the day, and renames some fields between API versions. Records are
//! deserialized leniently: a missing or non-numeric field counts as 0.

use super::SeoMetricsProvider;
use crate::fetch::{FetchError, RelayChain};
use async_trait::async_trait;
use compethink_common::config::ProvidersConfig;
use serde::Deserialize;
use serde_json::Value;

/// Normalized SEO-metrics result for one domain
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeoMetrics {
    /// Domain authority (provider "za")
    pub authority: u32,
    pub trust: u32,
    pub opportunity: u32,
    pub stability: u32,
    /// Site health as audited by the provider
    pub health: u32,
    /// Estimated monthly organic traffic
    pub traffic: u64,
    pub branded_traffic: u64,
    /// Number of AI keyword records returned
    pub ai_mentions: u32,
    /// Summed keyword visibility, capped at 100
    pub ai_visibility: u32,
}

/// Raw `action=metrics` record
///
/// Fields are kept as loose JSON values and read through [`lenient_int`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DomainMetricsRecord {
    #[serde(default)]
    pub za: Option<Value>,
    #[serde(default)]
    pub trust: Option<Value>,
    #[serde(default)]
    pub opportunity_val: Option<Value>,
    #[serde(default)]
    pub opportunity_score: Option<Value>,
    #[serde(default)]
    pub opportunity: Option<Value>,
    #[serde(default)]
    pub stability_val: Option<Value>,
    #[serde(default)]
    pub stability_score: Option<Value>,
    #[serde(default)]
    pub stability: Option<Value>,
    #[serde(default)]
    pub site_health: Option<Value>,
    #[serde(default)]
    pub health: Option<Value>,
    #[serde(default)]
    pub current_month_traffic: Option<Value>,
    #[serde(default)]
    pub branded_traffic: Option<Value>,
}

/// Raw `action=aikeywords` record
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AiKeywordRecord {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub visibility: Option<Value>,
}

impl DomainMetricsRecord {
    /// Fold a metrics record and the AI keyword list into [`SeoMetrics`]
    pub fn normalize(&self, keywords: &[AiKeywordRecord]) -> SeoMetrics {
        let visibility: f64 = keywords
            .iter()
            .map(|k| k.visibility.as_ref().map(lenient_float).unwrap_or(0.0))
            .sum();

        SeoMetrics {
            authority: saturating_u32(lenient_int(&[&self.za])),
            trust: saturating_u32(lenient_int(&[&self.trust])),
            opportunity: saturating_u32(lenient_int(&[
                &self.opportunity_val,
                &self.opportunity_score,
                &self.opportunity,
            ])),
            stability: saturating_u32(lenient_int(&[
                &self.stability_val,
                &self.stability_score,
                &self.stability,
            ])),
            health: saturating_u32(lenient_int(&[&self.site_health, &self.health])),
            traffic: lenient_int(&[&self.current_month_traffic]),
            branded_traffic: lenient_int(&[&self.branded_traffic]),
            ai_mentions: u32::try_from(keywords.len()).unwrap_or(u32::MAX),
            ai_visibility: visibility.round().clamp(0.0, 100.0) as u32,
        }
    }
}

fn saturating_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// First non-empty candidate read as a non-negative integer, 0 otherwise
///
/// Numbers are truncated; strings contribute their leading integer part.
fn lenient_int(candidates: &[&Option<Value>]) -> u64 {
    candidates
        .iter()
        .filter_map(|c| c.as_ref())
        .find(|v| is_present(v))
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64().map(f64::trunc),
            Value::String(s) => leading_number(s, false),
            _ => None,
        })
        .map(|f| if f.is_finite() && f > 0.0 { f as u64 } else { 0 })
        .unwrap_or(0)
}

fn lenient_float(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_number(s, true),
        _ => None,
    };
    parsed.filter(|f| f.is_finite()).unwrap_or(0.0)
}

// Empty strings, zeros and nulls fall through to the next candidate name
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Parse the numeric prefix of `s` ("45", "45.7%", " 12 visits")
fn leading_number(s: &str, allow_fraction: bool) -> Option<f64> {
    let s = s.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, c) in s.char_indices() {
        match c {
            '-' | '+' if i == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if allow_fraction && !seen_dot => seen_dot = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }
    if !seen_digit {
        return None;
    }
    s[..end].trim_end_matches('.').parse().ok()
}

/// HTTP client for the SEO-metrics provider
pub struct SeoMetricsClient {
    relays: RelayChain,
    base_url: String,
    database: String,
    keyword_limit: u32,
}

impl SeoMetricsClient {
    pub fn new(relays: RelayChain, config: &ProvidersConfig) -> Self {
        Self {
            relays,
            base_url: config.seo_base_url.clone(),
            database: config.seo_database.clone(),
            keyword_limit: config.ai_keyword_limit,
        }
    }

    fn endpoint(&self, params: &[(&str, &str)]) -> Result<String, FetchError> {
        reqwest::Url::parse_with_params(&self.base_url, params)
            .map(|u| u.to_string())
            .map_err(|e| FetchError::Malformed(format!("invalid SEO provider base URL: {e}")))
    }

    fn metrics_url(&self, domain: &str, api_key: &str) -> Result<String, FetchError> {
        self.endpoint(&[
            ("api_key", api_key),
            ("action", "metrics"),
            ("domain", domain),
            ("db", &self.database),
        ])
    }

    fn keywords_url(&self, domain: &str, api_key: &str) -> Result<String, FetchError> {
        let limit = self.keyword_limit.to_string();
        self.endpoint(&[
            ("api_key", api_key),
            ("action", "aikeywords"),
            ("domain", domain),
            ("db", &self.database),
            ("offset", "0"),
            ("limit", &limit),
        ])
    }

    /// Query both endpoints concurrently; either one failing fails the lookup
    pub async fn lookup(&self, domain: &str, api_key: &str) -> Result<SeoMetrics, FetchError> {
        let metrics_url = self.metrics_url(domain, api_key)?;
        let keywords_url = self.keywords_url(domain, api_key)?;

        let (metrics, keywords) = futures::try_join!(
            self.relays.fetch(&metrics_url),
            self.relays.fetch(&keywords_url)
        )?;

        let record = metrics
            .into_records()
            .into_iter()
            .next()
            .map(|value| {
                serde_json::from_value::<DomainMetricsRecord>(value).unwrap_or_else(|e| {
                    tracing::warn!(domain, error = %e, "Unreadable metrics record, using zeros");
                    DomainMetricsRecord::default()
                })
            })
            .unwrap_or_default();

        let keywords: Vec<AiKeywordRecord> = keywords
            .into_records()
            .into_iter()
            .map(|value| serde_json::from_value(value).unwrap_or_default())
            .collect();

        Ok(record.normalize(&keywords))
    }
}

#[async_trait]
impl SeoMetricsProvider for SeoMetricsClient {
    async fn fetch_metrics(&self, domain: &str, api_key: &str) -> Option<SeoMetrics> {
        if api_key.trim().is_empty() {
            tracing::debug!(domain, "No SEO credential, skipping SEO metrics");
            return None;
        }

        match self.lookup(domain, api_key.trim()).await {
            Ok(metrics) => {
                tracing::info!(
                    domain,
                    authority = metrics.authority,
                    traffic = metrics.traffic,
                    ai_mentions = metrics.ai_mentions,
                    "SEO metrics fetched"
                );
                Some(metrics)
            }
            Err(e) => {
                tracing::warn!(domain, error = %e, "SEO metrics unavailable");
                None
            }
        }
    }
}

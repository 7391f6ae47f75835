//! Provider adapters
//!
//! Three independent sources feed a competitor's metrics:
//! - [`seo_metrics`]: SEO-metrics provider, reachable only through relays
//! - [`ai_simulation`]: generative-analysis service with a structured-output schema
//! - [`performance`]: page-performance audit service
//!
//! Every adapter degrades to `None` ("no data") on failure after logging the
//! cause, so one failing source never stops the other two.

pub mod ai_simulation;
pub mod performance;
pub mod seo_metrics;

pub use ai_simulation::{AiAssessment, AiSimulationClient};
pub use performance::{PerformanceClient, PerformanceScores};
pub use seo_metrics::{SeoMetrics, SeoMetricsClient};

use crate::fetch::{build_http_client, FetchError, RelayChain};
use async_trait::async_trait;
use compethink_common::config::TomlConfig;
use std::sync::Arc;
use std::time::Duration;

/// Source of SEO metrics for a bare domain
#[async_trait]
pub trait SeoMetricsProvider: Send + Sync {
    /// `None` when the credential is missing or the provider gave nothing usable
    async fn fetch_metrics(&self, domain: &str, api_key: &str) -> Option<SeoMetrics>;
}

/// Source of AI-simulated qualitative estimates
#[async_trait]
pub trait AiSimulationProvider: Send + Sync {
    async fn assess(
        &self,
        domain: &str,
        technical: Option<&PerformanceScores>,
    ) -> Option<AiAssessment>;
}

/// Source of page-performance category scores
#[async_trait]
pub trait PerformanceProvider: Send + Sync {
    /// `target` is the competitor's domain or URL as entered
    async fn audit(&self, target: &str) -> Option<PerformanceScores>;
}

/// The three adapters used by the orchestrator
#[derive(Clone)]
pub struct Providers {
    pub seo: Arc<dyn SeoMetricsProvider>,
    pub ai: Arc<dyn AiSimulationProvider>,
    pub performance: Arc<dyn PerformanceProvider>,
}

impl Providers {
    pub fn new(
        seo: Arc<dyn SeoMetricsProvider>,
        ai: Arc<dyn AiSimulationProvider>,
        performance: Arc<dyn PerformanceProvider>,
    ) -> Self {
        Self {
            seo,
            ai,
            performance,
        }
    }

    /// Build the HTTP-backed adapters from configuration
    ///
    /// `ai_api_key` overrides the TOML value (resolved from the environment by
    /// the caller).
    pub fn from_config(config: &TomlConfig, ai_api_key: Option<String>) -> Result<Self, FetchError> {
        let ceiling_ms = config
            .relays
            .timeout_ms
            .max(config.performance.timeout_ms)
            .max(config.providers.ai_timeout_ms);
        let http_client = build_http_client(Duration::from_millis(ceiling_ms))?;

        let relays = RelayChain::from_config(http_client.clone(), &config.relays);
        let seo = SeoMetricsClient::new(relays, &config.providers);
        let performance = PerformanceClient::from_config(http_client.clone(), config);
        let ai = AiSimulationClient::new(
            http_client,
            &config.providers,
            ai_api_key.or_else(|| config.providers.ai_api_key.clone()),
        );

        Ok(Self::new(Arc::new(seo), Arc::new(ai), Arc::new(performance)))
    }
}

/// Clamp a provider number into the 0-100 metric range
pub(crate) fn percent(value: f64) -> u32 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u32
}

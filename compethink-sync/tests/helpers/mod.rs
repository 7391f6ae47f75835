//! Shared helpers for compethink-sync integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use compethink_sync::db::AuditStore;
use compethink_sync::providers::{
    AiAssessment, AiSimulationProvider, PerformanceProvider, PerformanceScores, Providers,
    SeoMetrics, SeoMetricsProvider,
};
use compethink_sync::AuditSession;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Serve `app` on an ephemeral local port; returns the base URL
pub async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Fresh in-memory session holding `api_key`
pub async fn memory_session(api_key: &str) -> AuditSession {
    let store = AuditStore::in_memory().await.unwrap();
    let mut session = AuditSession::open(store).await.unwrap();
    session.set_api_key(api_key).await.unwrap();
    session
}

/// Domains starting with this prefix make every fake provider return nothing
pub const FAILING_PREFIX: &str = "down";

fn fails(domain: &str) -> bool {
    domain.trim().starts_with(FAILING_PREFIX)
}

/// SEO provider returning fixed metrics
pub struct FakeSeo;

#[async_trait]
impl SeoMetricsProvider for FakeSeo {
    async fn fetch_metrics(&self, domain: &str, api_key: &str) -> Option<SeoMetrics> {
        if api_key.is_empty() || fails(domain) {
            return None;
        }
        Some(SeoMetrics {
            authority: 55,
            trust: 40,
            opportunity: 30,
            stability: 70,
            health: 80,
            traffic: 10_000,
            branded_traffic: 3_000,
            ai_mentions: 12,
            ai_visibility: 35,
        })
    }
}

/// AI provider returning fixed estimates
pub struct FakeAi;

#[async_trait]
impl AiSimulationProvider for FakeAi {
    async fn assess(
        &self,
        domain: &str,
        _technical: Option<&PerformanceScores>,
    ) -> Option<AiAssessment> {
        if fails(domain) {
            return None;
        }
        Some(AiAssessment {
            qualitative_ux: 70.0,
            brand_authority: 60.0,
            chatgpt: 40.0,
            perplexity: 35.0,
            gemini: 45.0,
            tech_stack: 75.0,
            content_quality: 65.0,
            branded_share: 30.0,
            ai_justification: "Established regional brand".to_string(),
        })
    }
}

/// Performance provider that records how many audits overlap
#[derive(Default)]
pub struct FakePerformance {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl FakePerformance {
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PerformanceProvider for FakePerformance {
    async fn audit(&self, target: &str) -> Option<PerformanceScores> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if fails(target) {
            return None;
        }
        Some(PerformanceScores {
            performance: 60,
            seo: 90,
            accessibility: 85,
            best_practices: 75,
        })
    }
}

pub fn fake_providers(performance: Arc<FakePerformance>) -> Providers {
    Providers::new(Arc::new(FakeSeo), Arc::new(FakeAi), performance)
}

//! HTTP-backed provider adapters against local fake services

mod helpers;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use compethink_common::config::ProvidersConfig;
use compethink_sync::fetch::{Relay, RelayChain, RetryPolicy};
use compethink_sync::providers::{
    PerformanceClient, PerformanceProvider, PerformanceScores, SeoMetricsClient,
    SeoMetricsProvider,
};
use helpers::spawn_server;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Relay that answers like the SEO provider would, recording each target
fn seo_relay(targets: Arc<Mutex<Vec<String>>>) -> Router {
    Router::new().route(
        "/relay",
        get(move |Query(params): Query<HashMap<String, String>>| async move {
            let target = params.get("url").cloned().unwrap_or_default();
            targets.lock().unwrap().push(target.clone());

            let body: Value = if target.contains("action=metrics") {
                json!({
                    "response": [{
                        "za": 52,
                        "trust": "38",
                        "opportunity_val": 0,
                        "opportunity_score": 27,
                        "stability": 64,
                        "site_health": 91.8,
                        "current_month_traffic": "120500",
                        "branded_traffic": 30125
                    }]
                })
            } else {
                json!({
                    "status": "success",
                    "response": [
                        { "keyword": "acme shoes", "visibility": 30 },
                        { "keyword": "acme boots", "visibility": "45.4" }
                    ]
                })
            };
            Json(body)
        }),
    )
}

fn seo_client(base: &str) -> SeoMetricsClient {
    let chain = RelayChain::new(
        reqwest::Client::new(),
        vec![Relay::new(format!("{base}/relay?url={{url}}"))],
        RetryPolicy::new(1, 10, 2_000),
    );
    let config = ProvidersConfig {
        seo_base_url: "https://seo.example/v2/".to_string(),
        seo_database: "it".to_string(),
        ..Default::default()
    };
    SeoMetricsClient::new(chain, &config)
}

#[tokio::test]
async fn test_seo_metrics_through_relay() {
    let targets = Arc::new(Mutex::new(Vec::new()));
    let base = spawn_server(seo_relay(targets.clone())).await;

    let metrics = seo_client(&base)
        .fetch_metrics("acme.it", " secret ")
        .await
        .expect("metrics");

    assert_eq!(metrics.authority, 52);
    assert_eq!(metrics.trust, 38);
    // Zero falls through to the next candidate field
    assert_eq!(metrics.opportunity, 27);
    assert_eq!(metrics.stability, 64);
    assert_eq!(metrics.health, 91);
    assert_eq!(metrics.traffic, 120_500);
    assert_eq!(metrics.branded_traffic, 30_125);
    assert_eq!(metrics.ai_mentions, 2);
    assert_eq!(metrics.ai_visibility, 75);

    let targets = targets.lock().unwrap();
    assert_eq!(targets.len(), 2);
    for target in targets.iter() {
        assert!(target.starts_with("https://seo.example/v2/?api_key=secret&"));
        assert!(target.contains("domain=acme.it"));
        assert!(target.contains("db=it"));
    }
    assert!(targets.iter().any(|t| t.contains("action=aikeywords")));
}

#[tokio::test]
async fn test_seo_metrics_skipped_without_credential() {
    let targets = Arc::new(Mutex::new(Vec::new()));
    let base = spawn_server(seo_relay(targets.clone())).await;

    assert!(seo_client(&base).fetch_metrics("acme.it", "  ").await.is_none());
    assert!(targets.lock().unwrap().is_empty());
}

/// Audit service answering every request with `status` and `body`
fn audit_service(status: StatusCode, body: Value, hits: Arc<AtomicUsize>) -> Router {
    Router::new().route(
        "/runPagespeed",
        get(move |Query(params): Query<Vec<(String, String)>>| async move {
            hits.fetch_add(1, Ordering::SeqCst);
            let categories = params.iter().filter(|(k, _)| k == "category").count();
            assert_eq!(categories, 4);
            (status, Json(body))
        }),
    )
}

fn performance_client(base: &str) -> PerformanceClient {
    PerformanceClient::new(
        reqwest::Client::new(),
        format!("{base}/runPagespeed"),
        None,
        RetryPolicy::new(2, 10, 2_000),
    )
}

#[tokio::test]
async fn test_performance_scores_are_scaled() {
    let hits = Arc::new(AtomicUsize::new(0));
    let body = json!({
        "lighthouseResult": {
            "categories": {
                "performance": { "score": 0.42 },
                "seo": { "score": 0.9 },
                "accessibility": { "score": 1.0 },
                "best-practices": { "score": 0.75 }
            }
        }
    });
    let base = spawn_server(audit_service(StatusCode::OK, body, hits.clone())).await;

    let scores = performance_client(&base).audit("acme.it").await;

    assert_eq!(
        scores,
        Some(PerformanceScores {
            performance: 42,
            seo: 90,
            accessibility: 100,
            best_practices: 75,
        })
    );
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_performance_client_error_is_not_retried() {
    let hits = Arc::new(AtomicUsize::new(0));
    let body = json!({ "error": { "code": 400, "message": "Invalid URL" } });
    let base = spawn_server(audit_service(StatusCode::BAD_REQUEST, body, hits.clone())).await;

    assert!(performance_client(&base).audit("not a domain").await.is_none());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_performance_server_error_is_retried() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_server(audit_service(
        StatusCode::SERVICE_UNAVAILABLE,
        json!({}),
        hits.clone(),
    ))
    .await;

    assert!(performance_client(&base).audit("acme.it").await.is_none());
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_performance_without_categories_is_no_data() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_server(audit_service(
        StatusCode::OK,
        json!({ "lighthouseResult": {} }),
        hits.clone(),
    ))
    .await;

    assert!(performance_client(&base).audit("acme.it").await.is_none());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

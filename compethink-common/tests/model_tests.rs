//! Entity factory and snapshot format
//!
//! Snapshots are stored as JSON and reloaded by later versions, so the
//! serialized shape is part of the contract.

use compethink_common::model::{Competitor, MarketAudit, DEFAULT_BRAND_NAME};
use compethink_common::schema::{validate_schema, MetricKey, Provenance, CLUSTERS};
use serde_json::json;

#[test]
fn test_factory_builds_every_metric_zeroed() {
    let competitor = Competitor::new("Acme", "acme.it");

    assert_eq!(competitor.clusters.len(), CLUSTERS.len());
    for key in MetricKey::ALL {
        let metric = competitor.metric(key).expect("metric present");
        assert_eq!(metric.score, 0);
        assert!(metric.raw_value.is_none());
    }
    assert_eq!(
        competitor.metric(MetricKey::BlogPresence).unwrap().provenance,
        Provenance::QualitativeOrdinal
    );
    validate_schema(CLUSTERS).unwrap();
}

#[test]
fn test_fresh_audit_has_default_brand() {
    let audit = MarketAudit::default();
    assert_eq!(audit.competitors.len(), 1);
    assert_eq!(audit.competitors[0].name, DEFAULT_BRAND_NAME);
    assert!(!audit.has_data());
    assert!(!audit.has_credential());
}

#[test]
fn test_resolved_domain() {
    let resolved = |d: &str| Competitor::new("x", d).resolved_domain();
    assert_eq!(resolved("acme.it").as_deref(), Some("acme.it"));
    assert_eq!(resolved(" https://Acme.IT/shop?x=1 ").as_deref(), Some("acme.it"));
    assert_eq!(resolved("http://acme.it").as_deref(), Some("acme.it"));
    assert_eq!(resolved("   "), None);
    assert_eq!(resolved("https://"), None);
}

#[test]
fn test_snapshot_round_trip() {
    let mut audit = MarketAudit::new("key");
    audit.client_name = "Client".to_string();
    let mut rival = Competitor::new("Rival", "rival.it");
    rival.metric_mut(MetricKey::SiteHealth).unwrap().raw_value =
        Some("SEO: 80 | Performance: 60".to_string());
    audit.competitors.push(rival);

    let json = serde_json::to_string(&audit).unwrap();
    let restored: MarketAudit = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, audit);
}

#[test]
fn test_metric_keys_serialize_as_display_names() {
    let competitor = Competitor::new("Acme", "acme.it");
    let value = serde_json::to_value(&competitor).unwrap();
    let first = &value["clusters"][0]["metrics"][0];
    assert_eq!(first["name"], json!(MetricKey::AuthorityScore.label()));
}

#[test]
fn test_unknown_metric_name_is_rejected() {
    let competitor = Competitor::new("Acme", "acme.it");
    let mut value = serde_json::to_value(&competitor).unwrap();
    value["clusters"][0]["metrics"][0]["name"] = json!("Retired Metric");
    assert!(serde_json::from_value::<Competitor>(value).is_err());
}

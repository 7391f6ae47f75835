//! Audit data model and entity factory
//!
//! A [`MarketAudit`] exclusively owns its [`Competitor`]s; each competitor owns
//! one [`Cluster`] per schema cluster, and each cluster owns its [`Metric`]s.
//! Derived fields (`avg_score`, `total_score`, `branded_share`) are written only
//! by the scoring engine in `compethink-sync`.

use crate::schema::{MetricKey, Provenance, CLUSTERS};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const DEFAULT_CLIENT_NAME: &str = "New Client";
pub const DEFAULT_COMPETITOR_NAME: &str = "New Competitor";
pub const DEFAULT_BRAND_NAME: &str = "My Brand";

/// One named, scored (0-100) signal within a cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    #[serde(rename = "name")]
    pub key: MetricKey,
    pub score: u32,
    /// Diagnostic breakdown (composite metrics only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_value: Option<String>,
    pub provenance: Provenance,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        self.key.label()
    }
}

/// Weighted category grouping related metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub name: String,
    pub weight: u32,
    pub metrics: Vec<Metric>,
    pub avg_score: u32,
}

/// One scored subject of the competitive analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competitor {
    pub id: Uuid,
    pub name: String,
    pub domain: String,
    pub organic_traffic: u64,
    pub branded_traffic: u64,
    pub branded_share: u32,
    pub total_score: u32,
    pub clusters: Vec<Cluster>,
    /// Branded-share estimate reported by the AI simulation (diagnostic only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branded_share_estimate: Option<u32>,
    /// Free-text justification returned with the AI estimates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_justification: Option<String>,
    #[serde(default)]
    pub last_synced: Option<DateTime<Utc>>,
}

impl Competitor {
    /// Entity factory: build a competitor from the schema with every metric zeroed
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        let clusters = CLUSTERS
            .iter()
            .map(|def| Cluster {
                id: def.id.to_string(),
                name: def.name.to_string(),
                weight: def.weight,
                avg_score: 0,
                metrics: def
                    .metrics
                    .iter()
                    .map(|m| Metric {
                        key: m.key,
                        score: 0,
                        raw_value: None,
                        provenance: m.provenance,
                    })
                    .collect(),
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            domain: domain.into(),
            organic_traffic: 0,
            branded_traffic: 0,
            branded_share: 0,
            total_score: 0,
            clusters,
            branded_share_estimate: None,
            ai_justification: None,
            last_synced: None,
        }
    }

    pub fn metric(&self, key: MetricKey) -> Option<&Metric> {
        self.clusters
            .iter()
            .flat_map(|c| c.metrics.iter())
            .find(|m| m.key == key)
    }

    pub fn metric_mut(&mut self, key: MetricKey) -> Option<&mut Metric> {
        self.clusters
            .iter_mut()
            .flat_map(|c| c.metrics.iter_mut())
            .find(|m| m.key == key)
    }

    pub fn cluster(&self, id: &str) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.id == id)
    }

    /// Bare host of the competitor's domain, lowercased
    ///
    /// Strips the scheme and anything after the first `/`. Returns `None` when
    /// nothing resolvable is left.
    pub fn resolved_domain(&self) -> Option<String> {
        let trimmed = self.domain.trim();
        let without_scheme = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .unwrap_or(trimmed);
        let host = without_scheme.split('/').next().unwrap_or_default().trim();
        if host.is_empty() {
            None
        } else {
            Some(host.to_lowercase())
        }
    }
}

impl Default for Competitor {
    fn default() -> Self {
        Self::new(DEFAULT_COMPETITOR_NAME, "")
    }
}

/// Top-level aggregate: one client's competitive analysis
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAudit {
    pub client_name: String,
    pub industry: String,
    /// SEO-metrics provider credential; only ever sent as a provider query parameter
    #[serde(default)]
    pub api_key: String,
    pub competitors: Vec<Competitor>,
    pub last_updated: DateTime<Utc>,
}

impl MarketAudit {
    /// Fresh audit holding a single default entity
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            industry: String::new(),
            api_key: api_key.into(),
            competitors: vec![Competitor::new(DEFAULT_BRAND_NAME, "")],
            last_updated: Utc::now(),
        }
    }

    /// True once the user has entered anything worth keeping
    pub fn has_data(&self) -> bool {
        self.client_name != DEFAULT_CLIENT_NAME
            || self.competitors.iter().any(|c| !c.domain.trim().is_empty())
    }

    pub fn has_credential(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn competitor(&self, id: Uuid) -> Option<&Competitor> {
        self.competitors.iter().find(|c| c.id == id)
    }

    pub fn competitor_mut(&mut self, id: Uuid) -> Option<&mut Competitor> {
        self.competitors.iter_mut().find(|c| c.id == id)
    }
}

impl Default for MarketAudit {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl fmt::Debug for MarketAudit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarketAudit")
            .field("client_name", &self.client_name)
            .field("industry", &self.industry)
            .field("api_key", &if self.has_credential() { "<redacted>" } else { "<unset>" })
            .field("competitors", &self.competitors)
            .field("last_updated", &self.last_updated)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::validate_schema;

    #[test]
    fn test_factory_matches_schema() {
        validate_schema(CLUSTERS).unwrap();
        let comp = Competitor::new("Acme", "acme.it");

        assert_eq!(comp.clusters.len(), CLUSTERS.len());
        for (cluster, def) in comp.clusters.iter().zip(CLUSTERS) {
            assert_eq!(cluster.id, def.id);
            assert_eq!(cluster.weight, def.weight);
            let keys: Vec<_> = cluster.metrics.iter().map(|m| m.key).collect();
            let expected: Vec<_> = def.metrics.iter().map(|m| m.key).collect();
            assert_eq!(keys, expected);
            assert!(cluster.metrics.iter().all(|m| m.score == 0));
        }
        assert_eq!(comp.total_score, 0);
        assert_eq!(comp.branded_share, 0);
    }

    #[test]
    fn test_factory_ids_are_unique() {
        assert_ne!(Competitor::default().id, Competitor::default().id);
    }

    #[test]
    fn test_resolved_domain() {
        let mut comp = Competitor::new("Acme", "https://www.Acme.it/chi-siamo");
        assert_eq!(comp.resolved_domain().as_deref(), Some("www.acme.it"));

        comp.domain = "http://acme.it".to_string();
        assert_eq!(comp.resolved_domain().as_deref(), Some("acme.it"));

        comp.domain = "   ".to_string();
        assert_eq!(comp.resolved_domain(), None);

        comp.domain = "https://".to_string();
        assert_eq!(comp.resolved_domain(), None);
    }

    #[test]
    fn test_new_audit_has_no_data() {
        let audit = MarketAudit::new("secret");
        assert!(!audit.has_data());
        assert!(audit.has_credential());
        assert_eq!(audit.competitors.len(), 1);
        assert_eq!(audit.competitors[0].name, DEFAULT_BRAND_NAME);
    }

    #[test]
    fn test_debug_redacts_credential() {
        let audit = MarketAudit::new("super-secret-key");
        let rendered = format!("{:?}", audit);
        assert!(!rendered.contains("super-secret-key"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_snapshot_json_uses_metric_names() {
        let comp = Competitor::new("Acme", "acme.it");
        let json = serde_json::to_value(&comp).unwrap();
        assert_eq!(json["clusters"][0]["metrics"][0]["name"], "Authority Score");
        let back: Competitor = serde_json::from_value(json).unwrap();
        assert_eq!(back, comp);
    }
}

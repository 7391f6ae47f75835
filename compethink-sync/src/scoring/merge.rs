//! Merge provider results into a competitor's metric tree
//!
//! Provider fields reach metrics only through the typed tables
//! [`SEO_FIELD_MAP`] and [`AI_FIELD_MAP`]; [`validate_field_maps`] checks them
//! against the schema at startup. SEO updates are applied first and AI
//! updates second, so the AI value wins whenever both touch a metric. Two
//! metrics are composites computed here rather than copied:
//!
//! - Site Health: `round(0.6 * seo_health + 0.4 * (performance or seo_health))`
//! - Website Grader: `round(.30 perf + .15 seo + .10 a11y + .10 bp + .20 ux + .15 content)`
//!   with a page audit, `round(0.6 ux + 0.4 content)` without one

use super::scorer::process_scores;
use crate::providers::{percent, AiAssessment, PerformanceScores, SeoMetrics};
use chrono::Utc;
use compethink_common::model::Competitor;
use compethink_common::schema::{cluster_of, MetricKey};
use compethink_common::{Error, Result};
use std::collections::{BTreeMap, HashSet};

/// Fields of [`SeoMetrics`] that feed metrics directly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeoField {
    Authority,
    Trust,
    Opportunity,
    Stability,
    AiMentions,
    AiVisibility,
}

impl SeoField {
    fn read(self, seo: &SeoMetrics) -> u32 {
        let value = match self {
            SeoField::Authority => seo.authority,
            SeoField::Trust => seo.trust,
            SeoField::Opportunity => seo.opportunity,
            SeoField::Stability => seo.stability,
            SeoField::AiMentions => seo.ai_mentions,
            SeoField::AiVisibility => seo.ai_visibility,
        };
        value.min(100)
    }
}

/// Fields of [`AiAssessment`] that feed metrics directly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiField {
    ChatGpt,
    Perplexity,
    Gemini,
    TechStack,
}

impl AiField {
    fn read(self, ai: &AiAssessment) -> u32 {
        percent(match self {
            AiField::ChatGpt => ai.chatgpt,
            AiField::Perplexity => ai.perplexity,
            AiField::Gemini => ai.gemini,
            AiField::TechStack => ai.tech_stack,
        })
    }
}

pub const SEO_FIELD_MAP: &[(SeoField, MetricKey)] = &[
    (SeoField::Authority, MetricKey::AuthorityScore),
    (SeoField::Trust, MetricKey::Trust),
    (SeoField::Opportunity, MetricKey::Opportunity),
    (SeoField::Stability, MetricKey::Stability),
    (SeoField::AiMentions, MetricKey::AiMentions),
    (SeoField::AiVisibility, MetricKey::AiVisibility),
];

/// The single tech-stack estimate fans out to the three stack metrics
pub const AI_FIELD_MAP: &[(AiField, MetricKey)] = &[
    (AiField::ChatGpt, MetricKey::ChatGptScore),
    (AiField::Perplexity, MetricKey::PerplexityScore),
    (AiField::Gemini, MetricKey::GeminiScore),
    (AiField::TechStack, MetricKey::StackMarketing),
    (AiField::TechStack, MetricKey::StackSales),
    (AiField::TechStack, MetricKey::StackService),
];

/// Metrics whose value is computed by a composite formula
pub const COMPOSITE_METRICS: [MetricKey; 2] = [MetricKey::SiteHealth, MetricKey::WebsiteGrader];

/// Check the mapping tables against the schema
///
/// Every target must belong to a cluster, appear once per table and not be a
/// composite.
pub fn validate_field_maps() -> Result<()> {
    let seo_targets = SEO_FIELD_MAP.iter().map(|(_, key)| *key);
    let ai_targets = AI_FIELD_MAP.iter().map(|(_, key)| *key);
    check_targets("SEO", seo_targets)?;
    check_targets("AI", ai_targets)?;
    Ok(())
}

fn check_targets(table: &str, targets: impl Iterator<Item = MetricKey>) -> Result<()> {
    let mut seen = HashSet::new();
    for key in targets {
        if cluster_of(key).is_none() {
            return Err(Error::Schema(format!(
                "{table} field map targets '{key}', which is not in the schema"
            )));
        }
        if COMPOSITE_METRICS.contains(&key) {
            return Err(Error::Schema(format!(
                "{table} field map targets composite metric '{key}'"
            )));
        }
        if !seen.insert(key) {
            return Err(Error::Schema(format!("{table} field map targets '{key}' twice")));
        }
    }
    Ok(())
}

/// Results of one sync round; `None` means the adapter returned no data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderResults {
    pub seo: Option<SeoMetrics>,
    pub ai: Option<AiAssessment>,
    pub performance: Option<PerformanceScores>,
}

impl ProviderResults {
    pub fn is_empty(&self) -> bool {
        self.seo.is_none() && self.ai.is_none() && self.performance.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct MetricUpdate {
    score: u32,
    raw_value: Option<String>,
}

impl MetricUpdate {
    fn plain(score: u32) -> Self {
        Self {
            score,
            raw_value: None,
        }
    }
}

/// Site Health composite and its breakdown
pub fn site_health(seo_health: u32, performance: Option<&PerformanceScores>) -> (u32, String) {
    let seo_health = seo_health.min(100);
    let perf = performance.map(|p| p.performance).unwrap_or(seo_health);
    let score = (0.6 * f64::from(seo_health) + 0.4 * f64::from(perf)).round() as u32;
    (score, format!("SEO: {seo_health} | Performance: {perf}"))
}

/// Website Grader composite and its breakdown
pub fn website_grader(ai: &AiAssessment, performance: Option<&PerformanceScores>) -> (u32, String) {
    let ux = percent(ai.qualitative_ux);
    let content = percent(ai.content_quality);

    match performance {
        Some(p) => {
            let score = 0.30 * f64::from(p.performance)
                + 0.15 * f64::from(p.seo)
                + 0.10 * f64::from(p.accessibility)
                + 0.10 * f64::from(p.best_practices)
                + 0.20 * f64::from(ux)
                + 0.15 * f64::from(content);
            (
                score.round() as u32,
                format!(
                    "P:{} S:{} A:{} BP:{} | UX:{} C:{}",
                    p.performance, p.seo, p.accessibility, p.best_practices, ux, content
                ),
            )
        }
        None => {
            let score = 0.6 * f64::from(ux) + 0.4 * f64::from(content);
            (score.round() as u32, format!("AI audit: UX {ux} | Content {content}"))
        }
    }
}

fn collect_updates(results: &ProviderResults) -> BTreeMap<MetricKey, MetricUpdate> {
    let mut updates = BTreeMap::new();

    if let Some(seo) = &results.seo {
        for (field, key) in SEO_FIELD_MAP {
            updates.insert(*key, MetricUpdate::plain(field.read(seo)));
        }
        let (score, breakdown) = site_health(seo.health, results.performance.as_ref());
        updates.insert(
            MetricKey::SiteHealth,
            MetricUpdate {
                score,
                raw_value: Some(breakdown),
            },
        );
    }

    // Applied after SEO: AI wins on any overlap
    if let Some(ai) = &results.ai {
        for (field, key) in AI_FIELD_MAP {
            updates.insert(*key, MetricUpdate::plain(field.read(ai)));
        }
        let (score, breakdown) = website_grader(ai, results.performance.as_ref());
        updates.insert(
            MetricKey::WebsiteGrader,
            MetricUpdate {
                score,
                raw_value: Some(breakdown),
            },
        );
    }

    updates
}

/// Apply provider results to a copy of `competitor` and rescore it
///
/// Metrics no provider touched keep their previous value.
pub fn merge_results(competitor: &Competitor, results: &ProviderResults) -> Competitor {
    let mut updated = competitor.clone();

    if let Some(seo) = &results.seo {
        updated.organic_traffic = seo.traffic;
        updated.branded_traffic = seo.branded_traffic;
    }
    if let Some(ai) = &results.ai {
        updated.branded_share_estimate = Some(percent(ai.branded_share));
        updated.ai_justification = Some(ai.ai_justification.clone());
    }

    let updates = collect_updates(results);
    for metric in updated.clusters.iter_mut().flat_map(|c| c.metrics.iter_mut()) {
        if let Some(update) = updates.get(&metric.key) {
            metric.score = update.score;
            metric.raw_value = update.raw_value.clone();
        }
    }

    process_scores(&mut updated);
    updated.last_synced = Some(Utc::now());

    tracing::debug!(
        competitor = %updated.name,
        metrics_updated = updates.len(),
        total_score = updated.total_score,
        "Merged provider results"
    );
    updated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seo() -> SeoMetrics {
        SeoMetrics {
            authority: 45,
            trust: 30,
            opportunity: 60,
            stability: 70,
            health: 80,
            traffic: 10_000,
            branded_traffic: 2_500,
            ai_mentions: 12,
            ai_visibility: 34,
        }
    }

    fn ai() -> AiAssessment {
        AiAssessment {
            qualitative_ux: 70.0,
            brand_authority: 65.0,
            chatgpt: 40.0,
            perplexity: 35.0,
            gemini: 55.0,
            tech_stack: 50.0,
            content_quality: 60.0,
            branded_share: 22.0,
            ai_justification: "Recognized brand.".to_string(),
        }
    }

    fn perf() -> PerformanceScores {
        PerformanceScores {
            performance: 90,
            seo: 100,
            accessibility: 80,
            best_practices: 70,
        }
    }

    fn score(comp: &Competitor, key: MetricKey) -> u32 {
        comp.metric(key).unwrap().score
    }

    #[test]
    fn test_builtin_field_maps_are_valid() {
        validate_field_maps().unwrap();
    }

    #[test]
    fn test_site_health_composite() {
        assert_eq!(site_health(80, Some(&perf())).0, 84);
        let (score, breakdown) = site_health(80, None);
        assert_eq!(score, 80);
        assert_eq!(breakdown, "SEO: 80 | Performance: 80");
    }

    #[test]
    fn test_grader_with_performance() {
        // .30*90 + .15*100 + .10*80 + .10*70 + .20*70 + .15*60 = 80
        let (score, breakdown) = website_grader(&ai(), Some(&perf()));
        assert_eq!(score, 80);
        assert_eq!(breakdown, "P:90 S:100 A:80 BP:70 | UX:70 C:60");
    }

    #[test]
    fn test_grader_without_performance() {
        assert_eq!(website_grader(&ai(), None).0, 66);

        let mut neutral = ai();
        neutral.qualitative_ux = 50.0;
        neutral.content_quality = 50.0;
        assert_eq!(website_grader(&neutral, None).0, 50);
    }

    #[test]
    fn test_seo_only_merge() {
        let comp = Competitor::new("Acme", "acme.it");
        let results = ProviderResults {
            seo: Some(seo()),
            ..Default::default()
        };
        let merged = merge_results(&comp, &results);

        assert_eq!(score(&merged, MetricKey::AuthorityScore), 45);
        assert_eq!(score(&merged, MetricKey::Trust), 30);
        assert_eq!(score(&merged, MetricKey::AiMentions), 12);
        assert_eq!(score(&merged, MetricKey::AiVisibility), 34);
        assert_eq!(score(&merged, MetricKey::SiteHealth), 80);
        assert_eq!(score(&merged, MetricKey::WebsiteGrader), 0);
        assert_eq!(merged.organic_traffic, 10_000);
        assert_eq!(merged.branded_share, 25);
        assert!(merged.last_synced.is_some());
        assert!(merged.total_score > 0);
        // Input untouched
        assert_eq!(comp.total_score, 0);
    }

    #[test]
    fn test_full_merge() {
        let comp = Competitor::new("Acme", "acme.it");
        let results = ProviderResults {
            seo: Some(seo()),
            ai: Some(ai()),
            performance: Some(perf()),
        };
        let merged = merge_results(&comp, &results);

        assert_eq!(score(&merged, MetricKey::ChatGptScore), 40);
        assert_eq!(score(&merged, MetricKey::StackMarketing), 50);
        assert_eq!(score(&merged, MetricKey::StackSales), 50);
        assert_eq!(score(&merged, MetricKey::StackService), 50);
        assert_eq!(score(&merged, MetricKey::LeadGenTools), 0);
        assert_eq!(score(&merged, MetricKey::SiteHealth), 84);
        assert_eq!(score(&merged, MetricKey::WebsiteGrader), 80);
        assert_eq!(
            merged.metric(MetricKey::WebsiteGrader).unwrap().raw_value.as_deref(),
            Some("P:90 S:100 A:80 BP:70 | UX:70 C:60")
        );
        assert_eq!(merged.branded_share_estimate, Some(22));
        // Measured traffic decides the branded share, not the estimate
        assert_eq!(merged.branded_share, 25);
    }

    #[test]
    fn test_untouched_metrics_keep_manual_values() {
        let mut comp = Competitor::new("Acme", "acme.it");
        comp.metric_mut(MetricKey::BlogPresence).unwrap().score = 75;
        comp.metric_mut(MetricKey::ChatGptScore).unwrap().score = 90;

        let results = ProviderResults {
            seo: Some(seo()),
            ..Default::default()
        };
        let merged = merge_results(&comp, &results);
        assert_eq!(score(&merged, MetricKey::BlogPresence), 75);
        assert_eq!(score(&merged, MetricKey::ChatGptScore), 90);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let mut wild = ai();
        wild.chatgpt = 140.0;
        wild.gemini = -20.0;
        let mut big = seo();
        big.ai_mentions = 250;

        let merged = merge_results(
            &Competitor::new("Acme", "acme.it"),
            &ProviderResults {
                seo: Some(big),
                ai: Some(wild),
                performance: None,
            },
        );
        assert_eq!(score(&merged, MetricKey::ChatGptScore), 100);
        assert_eq!(score(&merged, MetricKey::GeminiScore), 0);
        assert_eq!(score(&merged, MetricKey::AiMentions), 100);
    }

    #[test]
    fn test_performance_only_changes_nothing_but_sync_time() {
        let comp = Competitor::new("Acme", "acme.it");
        let merged = merge_results(
            &comp,
            &ProviderResults {
                performance: Some(perf()),
                ..Default::default()
            },
        );
        assert_eq!(merged.clusters, comp.clusters);
        assert!(merged.last_synced.is_some());
    }
}

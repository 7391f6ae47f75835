//! Market-level statistics over an audit

use compethink_common::model::{Competitor, MarketAudit};
use serde::Serialize;

/// Headline figures for the dashboard and `show` command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditSummary {
    pub competitor_count: usize,
    /// Rounded mean total score (0-1000)
    pub average_score: u32,
    /// Name of the competitor with the highest total score
    pub top_performer: Option<String>,
    pub average_traffic: u64,
    pub average_branded_share: u32,
}

fn rounded_mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        0.0
    } else {
        (sum / count as f64).round()
    }
}

pub fn summarize(audit: &MarketAudit) -> AuditSummary {
    let comps = &audit.competitors;
    AuditSummary {
        competitor_count: comps.len(),
        average_score: rounded_mean(comps.iter().map(|c| f64::from(c.total_score))) as u32,
        top_performer: ranking(audit).first().map(|c| c.name.clone()),
        average_traffic: rounded_mean(comps.iter().map(|c| c.organic_traffic as f64)) as u64,
        average_branded_share: rounded_mean(comps.iter().map(|c| f64::from(c.branded_share)))
            as u32,
    }
}

/// Per cluster id (schema order), the rounded mean `avg_score` across competitors
pub fn cluster_averages(audit: &MarketAudit) -> Vec<(String, u32)> {
    let Some(first) = audit.competitors.first() else {
        return Vec::new();
    };

    first
        .clusters
        .iter()
        .map(|cluster| {
            let scores = audit
                .competitors
                .iter()
                .filter_map(|c| c.cluster(&cluster.id))
                .map(|c| f64::from(c.avg_score));
            (cluster.id.clone(), rounded_mean(scores) as u32)
        })
        .collect()
}

/// Competitor with the highest branded share (first one wins a tie)
pub fn most_branded(audit: &MarketAudit) -> Option<&Competitor> {
    audit
        .competitors
        .iter()
        .reduce(|best, c| if c.branded_share > best.branded_share { c } else { best })
}

/// Competitors by total score, best first; ties keep audit order
pub fn ranking(audit: &MarketAudit) -> Vec<&Competitor> {
    let mut ranked: Vec<&Competitor> = audit.competitors.iter().collect();
    ranked.sort_by(|a, b| b.total_score.cmp(&a.total_score));
    ranked
}

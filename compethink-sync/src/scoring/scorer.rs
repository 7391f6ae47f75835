//! Weighted score computation
//!
//! ```text
//! cluster.avg_score = round(mean(metric.score))           // 0 for an empty cluster
//! total_score       = round(1000 * Σ(avg * weight) / Σ(100 * weight))
//! branded_share     = round(100 * branded / organic)      // 0 when organic == 0
//! ```
//!
//! [`process_scores`] only reads metric scores and traffic figures and only
//! writes the derived fields, so running it twice is the same as running it once.

use compethink_common::model::{Cluster, Competitor};

pub const MAX_METRIC_SCORE: u32 = 100;
pub const MAX_TOTAL_SCORE: u32 = 1000;

/// Recompute every derived field of a competitor in place
pub fn process_scores(competitor: &mut Competitor) {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for cluster in &mut competitor.clusters {
        cluster.avg_score = cluster_average(cluster);
        weighted_sum += f64::from(cluster.avg_score) * f64::from(cluster.weight);
        total_weight += f64::from(MAX_METRIC_SCORE) * f64::from(cluster.weight);
    }

    competitor.total_score = if total_weight > 0.0 {
        (f64::from(MAX_TOTAL_SCORE) * weighted_sum / total_weight).round() as u32
    } else {
        0
    };

    competitor.branded_share = branded_share(competitor.organic_traffic, competitor.branded_traffic);
}

/// Owned variant of [`process_scores`]
pub fn scored(mut competitor: Competitor) -> Competitor {
    process_scores(&mut competitor);
    competitor
}

/// Rounded mean of a cluster's metric scores
///
/// Scores above 100 (only possible in hand-edited snapshots) count as 100.
pub fn cluster_average(cluster: &Cluster) -> u32 {
    if cluster.metrics.is_empty() {
        return 0;
    }
    let sum: f64 = cluster
        .metrics
        .iter()
        .map(|m| f64::from(m.score.min(MAX_METRIC_SCORE)))
        .sum();
    (sum / cluster.metrics.len() as f64).round() as u32
}

/// Percentage of organic traffic coming from branded searches, capped at 100
pub fn branded_share(organic_traffic: u64, branded_traffic: u64) -> u32 {
    if organic_traffic == 0 {
        return 0;
    }
    let share = (100.0 * branded_traffic as f64 / organic_traffic as f64).round();
    share.min(100.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use compethink_common::model::Metric;
    use compethink_common::schema::{MetricKey, Provenance};

    fn cluster(id: &str, weight: u32, scores: &[u32]) -> Cluster {
        Cluster {
            id: id.to_string(),
            name: id.to_string(),
            weight,
            avg_score: 0,
            metrics: scores
                .iter()
                .zip(MetricKey::ALL)
                .map(|(score, key)| Metric {
                    key,
                    score: *score,
                    raw_value: None,
                    provenance: Provenance::ExternalNumeric,
                })
                .collect(),
        }
    }

    fn competitor_with(clusters: Vec<Cluster>) -> Competitor {
        let mut comp = Competitor::new("Acme", "acme.it");
        comp.clusters = clusters;
        comp
    }

    #[test]
    fn test_two_equal_clusters_at_fifty() {
        let mut comp = competitor_with(vec![
            cluster("a", 10, &[50, 50, 50]),
            cluster("b", 10, &[50, 50]),
        ]);
        process_scores(&mut comp);

        assert_eq!(comp.clusters[0].avg_score, 50);
        assert_eq!(comp.clusters[1].avg_score, 50);
        assert_eq!(comp.total_score, 500);
    }

    #[test]
    fn test_weights_shift_total() {
        let mut comp = competitor_with(vec![cluster("a", 3, &[100]), cluster("b", 1, &[0])]);
        process_scores(&mut comp);
        assert_eq!(comp.total_score, 750);
    }

    #[test]
    fn test_cluster_average_rounds() {
        assert_eq!(cluster_average(&cluster("a", 1, &[25, 50])), 38);
        assert_eq!(cluster_average(&cluster("a", 1, &[0, 0, 100])), 33);
        assert_eq!(cluster_average(&cluster("a", 1, &[])), 0);
    }

    #[test]
    fn test_empty_schema_scores_zero() {
        let mut comp = competitor_with(Vec::new());
        process_scores(&mut comp);
        assert_eq!(comp.total_score, 0);
    }

    #[test]
    fn test_bounds_hold_for_extremes() {
        let mut comp = competitor_with(vec![
            cluster("a", 10, &[100, 100]),
            cluster("b", 9, &[100]),
        ]);
        process_scores(&mut comp);
        assert_eq!(comp.total_score, MAX_TOTAL_SCORE);

        let mut comp = competitor_with(vec![cluster("a", 10, &[0, 0])]);
        process_scores(&mut comp);
        assert_eq!(comp.total_score, 0);

        let mut comp = competitor_with(vec![cluster("a", 10, &[250])]);
        process_scores(&mut comp);
        assert_eq!(comp.clusters[0].avg_score, 100);
        assert_eq!(comp.total_score, MAX_TOTAL_SCORE);
    }

    #[test]
    fn test_bounds_hold_across_mixed_scores() {
        // None leaves the metric as the schema created it
        const STEPS: [Option<u32>; 4] = [Some(0), Some(50), Some(100), None];
        const TRAFFIC: [(u64, u64); 5] = [(0, 0), (0, 900), (1_000, 0), (1_000, 999), (10, 50_000)];

        for seed in 0..600usize {
            let mut comp = Competitor::new("Acme", "acme.it");
            (comp.organic_traffic, comp.branded_traffic) = TRAFFIC[seed % TRAFFIC.len()];
            for (i, key) in MetricKey::ALL.iter().enumerate() {
                if let Some(score) = STEPS[(seed / (i % 5 + 1) + i * seed) % STEPS.len()] {
                    comp.metric_mut(*key).unwrap().score = score;
                }
            }

            process_scores(&mut comp);

            for cluster in &comp.clusters {
                assert!(cluster.avg_score <= MAX_METRIC_SCORE, "seed {seed}: {}", cluster.id);
            }
            assert!(comp.total_score <= MAX_TOTAL_SCORE, "seed {seed}");
            assert!(comp.branded_share <= 100, "seed {seed}");
        }
    }

    #[test]
    fn test_idempotent() {
        let mut comp = Competitor::new("Acme", "acme.it");
        comp.organic_traffic = 9_000;
        comp.branded_traffic = 1_234;
        for (i, key) in MetricKey::ALL.iter().enumerate() {
            comp.metric_mut(*key).unwrap().score = (i as u32 * 37) % 101;
        }

        let once = scored(comp.clone());
        let twice = scored(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_branded_share() {
        assert_eq!(branded_share(0, 5_000), 0);
        assert_eq!(branded_share(0, 0), 0);
        assert_eq!(branded_share(1_000, 333), 33);
        assert_eq!(branded_share(1_000, 335), 34);
        assert_eq!(branded_share(100, 400), 100);
    }
}

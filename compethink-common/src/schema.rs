//! Metric schema
//!
//! Static definition of what gets scored: the weighted clusters, the ordered
//! metric list of each cluster and the provenance of every metric.
//!
//! This is the single source of truth for metric names. Provider payloads are
//! never matched against free text; the sync layer maps provider fields onto
//! [`MetricKey`] through explicit tables and validates them against this schema
//! at startup.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

/// Where a metric value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    /// Numeric value reported by the SEO-metrics provider
    ExternalNumeric,
    /// Ordinal rating entered by an analyst
    QualitativeOrdinal,
    /// Value estimated by the AI-simulation provider (possibly blended)
    AiDerived,
    /// Value calculated locally from other inputs
    Calculated,
}

/// Every metric known to the scoring model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKey {
    AuthorityScore,
    WebsiteGrader,
    SiteHealth,
    Trust,
    AiMentions,
    AiVisibility,
    ChatGptScore,
    PerplexityScore,
    GeminiScore,
    BlogPresence,
    Opportunity,
    Stability,
    SocialBrandImage,
    SocialEngagement,
    ManagedProfiles,
    VerticalSocials,
    CommunityMarketing,
    VideoUsage,
    SocialAdsStrategy,
    SearchAdsStrategy,
    StackMarketing,
    StackSales,
    StackService,
    LeadGenTools,
}

impl MetricKey {
    pub const ALL: [MetricKey; 24] = [
        MetricKey::AuthorityScore,
        MetricKey::WebsiteGrader,
        MetricKey::SiteHealth,
        MetricKey::Trust,
        MetricKey::AiMentions,
        MetricKey::AiVisibility,
        MetricKey::ChatGptScore,
        MetricKey::PerplexityScore,
        MetricKey::GeminiScore,
        MetricKey::BlogPresence,
        MetricKey::Opportunity,
        MetricKey::Stability,
        MetricKey::SocialBrandImage,
        MetricKey::SocialEngagement,
        MetricKey::ManagedProfiles,
        MetricKey::VerticalSocials,
        MetricKey::CommunityMarketing,
        MetricKey::VideoUsage,
        MetricKey::SocialAdsStrategy,
        MetricKey::SearchAdsStrategy,
        MetricKey::StackMarketing,
        MetricKey::StackSales,
        MetricKey::StackService,
        MetricKey::LeadGenTools,
    ];

    /// Display name, unique across the schema
    pub const fn label(self) -> &'static str {
        match self {
            Self::AuthorityScore => "Authority Score",
            Self::WebsiteGrader => "Website Grader",
            Self::SiteHealth => "Site Health",
            Self::Trust => "Trust",
            Self::AiMentions => "AI Mentions",
            Self::AiVisibility => "AI Visibility",
            Self::ChatGptScore => "ChatGPT Score",
            Self::PerplexityScore => "Perplexity Score",
            Self::GeminiScore => "Gemini Score",
            Self::BlogPresence => "Company Blog Presence",
            Self::Opportunity => "Opportunity",
            Self::Stability => "Stability",
            Self::SocialBrandImage => "Social Brand Image",
            Self::SocialEngagement => "Social Engagement",
            Self::ManagedProfiles => "Managed Profiles",
            Self::VerticalSocials => "Vertical Socials",
            Self::CommunityMarketing => "Community Marketing",
            Self::VideoUsage => "Video Usage",
            Self::SocialAdsStrategy => "Social Ads Strategy",
            Self::SearchAdsStrategy => "Search Ads Strategy",
            Self::StackMarketing => "Stack Marketing",
            Self::StackSales => "Stack Sales",
            Self::StackService => "Stack Service",
            Self::LeadGenTools => "Lead Gen Tools",
        }
    }

    /// Case-insensitive lookup by display name
    pub fn from_label(name: &str) -> Option<Self> {
        let wanted = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|key| key.label().eq_ignore_ascii_case(wanted))
    }

    /// Provenance as declared by the schema
    pub fn provenance(self) -> Provenance {
        CLUSTERS
            .iter()
            .flat_map(|cluster| cluster.metrics.iter())
            .find(|def| def.key == self)
            .map(|def| def.provenance)
            .unwrap_or(Provenance::QualitativeOrdinal)
    }

    /// Ordinal scale accepted for manual edits, if the metric is rated by hand
    pub fn scale(self) -> Option<QualitativeScale> {
        match self {
            Self::SocialEngagement => Some(QualitativeScale::Engagement),
            Self::StackMarketing | Self::StackSales | Self::StackService | Self::LeadGenTools => {
                Some(QualitativeScale::Tech)
            }
            key if key.provenance() == Provenance::QualitativeOrdinal => {
                Some(QualitativeScale::Standard)
            }
            _ => None,
        }
    }

    /// Short analyst-facing description of the metric
    pub const fn description(self) -> MetricDescription {
        let (summary, source) = match self {
            Self::AuthorityScore => (
                "Authority of the domain based on its backlink profile and ranking history.",
                "SEO-metrics provider",
            ),
            Self::WebsiteGrader => (
                "Hybrid grade of performance, SEO, UX and accessibility.",
                "Page-performance audit + AI simulation",
            ),
            Self::SiteHealth => (
                "Technical health: broken pages, duplication, crawl speed.",
                "SEO-metrics audit + page-performance audit",
            ),
            Self::Trust => (
                "Reliability of the domain as perceived by search engines.",
                "SEO-metrics provider",
            ),
            Self::AiMentions => (
                "How often the brand appears in AI-engine keyword datasets.",
                "SEO-metrics provider",
            ),
            Self::AiVisibility => (
                "Share of presence in AI-generated answers.",
                "SEO-metrics provider",
            ),
            Self::ChatGptScore => (
                "How well the brand surfaces in ChatGPT answers.",
                "AI simulation",
            ),
            Self::PerplexityScore => (
                "How often the brand is cited as a source by Perplexity.",
                "AI simulation",
            ),
            Self::GeminiScore => (
                "Optimization for Google's generative ecosystem.",
                "AI simulation",
            ),
            Self::BlogPresence => (
                "Freshness and relevance of the company blog.",
                "Content review",
            ),
            Self::Opportunity => (
                "Estimated growth potential on uncovered keywords.",
                "SEO-metrics provider",
            ),
            Self::Stability => (
                "Resilience of organic rankings to algorithm updates.",
                "SEO-metrics provider",
            ),
            Self::SocialBrandImage => (
                "Visual and editorial consistency across social channels.",
                "Qualitative review",
            ),
            Self::SocialEngagement => (
                "Ratio between followers and real interactions.",
                "Social calculation",
            ),
            Self::ManagedProfiles => (
                "Breadth of presence on the main social channels.",
                "Qualitative review",
            ),
            Self::VerticalSocials => (
                "Use of industry-specific channels.",
                "Qualitative review",
            ),
            Self::CommunityMarketing => (
                "Active community management strategies.",
                "Qualitative review",
            ),
            Self::VideoUsage => (
                "Effective use of video formats (shorts, reels, long form).",
                "Qualitative review",
            ),
            Self::SocialAdsStrategy => (
                "Maturity of paid social campaigns.",
                "Qualitative review",
            ),
            Self::SearchAdsStrategy => (
                "Use of search advertising.",
                "Qualitative review",
            ),
            Self::StackMarketing => ("Automation and tracking tooling.", "MarTech review"),
            Self::StackSales => ("CRM and sales pipeline integration.", "SalesTech review"),
            Self::StackService => ("Customer care and support tooling.", "ServiceTech review"),
            Self::LeadGenTools => (
                "Effectiveness of forms and conversion tools.",
                "Qualitative review",
            ),
        };
        MetricDescription { summary, source }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// Metric keys travel as their display name so stored snapshots stay readable;
// an unknown name is a hard error rather than a silently dropped metric.
impl Serialize for MetricKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for MetricKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        MetricKey::from_label(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown metric name: {name}")))
    }
}

/// Description shown next to a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDescription {
    pub summary: &'static str,
    pub source: &'static str,
}

/// Ordinal scales used for manually rated metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualitativeScale {
    /// 0 / 25 / 50 / 75 / 100
    Standard,
    /// 0 / 50 / 100 (stack and lead-gen tooling: absent, partial, mature)
    Tech,
    /// Interaction-rate buckets
    Engagement,
}

/// Engagement buckets: interaction rate label → score
const ENGAGEMENT_BUCKETS: [(&str, u32); 5] = [
    ("> 5", 100),
    ("4 - 5", 75),
    ("2 - 3", 50),
    ("1 - 2", 25),
    ("< 1", 0),
];

impl QualitativeScale {
    pub const fn values(self) -> &'static [u32] {
        match self {
            Self::Standard => &[0, 25, 50, 75, 100],
            Self::Tech => &[0, 50, 100],
            Self::Engagement => &[100, 75, 50, 25, 0],
        }
    }

    pub fn contains(self, score: u32) -> bool {
        self.values().contains(&score)
    }

    /// Bucket label for `score`, for scales that label their steps
    pub fn label_for(self, score: u32) -> Option<&'static str> {
        match self {
            Self::Engagement => ENGAGEMENT_BUCKETS
                .iter()
                .find(|(_, value)| *value == score)
                .map(|(label, _)| *label),
            Self::Standard | Self::Tech => None,
        }
    }
}

/// One metric slot of a cluster definition
#[derive(Debug, Clone, Copy)]
pub struct MetricDef {
    pub key: MetricKey,
    pub provenance: Provenance,
}

/// One weighted scoring category
#[derive(Debug, Clone, Copy)]
pub struct ClusterDef {
    pub id: &'static str,
    pub name: &'static str,
    pub weight: u32,
    pub metrics: &'static [MetricDef],
}

const fn def(key: MetricKey, provenance: Provenance) -> MetricDef {
    MetricDef { key, provenance }
}

use MetricKey as K;
use Provenance::{AiDerived, Calculated, ExternalNumeric, QualitativeOrdinal};

/// The scoring schema, in display order
pub static CLUSTERS: &[ClusterDef] = &[
    ClusterDef {
        id: "authority",
        name: "Website Authority & Performance",
        weight: 10,
        metrics: &[
            def(K::AuthorityScore, ExternalNumeric),
            def(K::WebsiteGrader, AiDerived),
            def(K::SiteHealth, ExternalNumeric),
            def(K::Trust, ExternalNumeric),
        ],
    },
    ClusterDef {
        id: "ai_aeo",
        name: "AI Readiness & AEO",
        weight: 9,
        metrics: &[
            def(K::AiMentions, ExternalNumeric),
            def(K::AiVisibility, ExternalNumeric),
            def(K::ChatGptScore, AiDerived),
            def(K::PerplexityScore, AiDerived),
            def(K::GeminiScore, AiDerived),
        ],
    },
    ClusterDef {
        id: "content",
        name: "Content Strategy & SEO",
        weight: 10,
        metrics: &[
            def(K::BlogPresence, QualitativeOrdinal),
            def(K::Opportunity, ExternalNumeric),
            def(K::Stability, ExternalNumeric),
        ],
    },
    ClusterDef {
        id: "social",
        name: "Social Media & Community",
        weight: 8,
        metrics: &[
            def(K::SocialBrandImage, QualitativeOrdinal),
            def(K::SocialEngagement, Calculated),
            def(K::ManagedProfiles, QualitativeOrdinal),
            def(K::VerticalSocials, QualitativeOrdinal),
            def(K::CommunityMarketing, QualitativeOrdinal),
            def(K::VideoUsage, QualitativeOrdinal),
        ],
    },
    ClusterDef {
        id: "advertising",
        name: "Ads (Search & Social)",
        weight: 8,
        metrics: &[
            def(K::SocialAdsStrategy, QualitativeOrdinal),
            def(K::SearchAdsStrategy, QualitativeOrdinal),
        ],
    },
    ClusterDef {
        id: "stack",
        name: "Tech Stack (Marketing/Sales/Service)",
        weight: 9,
        metrics: &[
            def(K::StackMarketing, QualitativeOrdinal),
            def(K::StackSales, QualitativeOrdinal),
            def(K::StackService, QualitativeOrdinal),
            def(K::LeadGenTools, QualitativeOrdinal),
        ],
    },
];

/// Validate a cluster schema
///
/// Fails when a cluster id repeats, a weight is zero, a metric appears twice,
/// or a known metric key is missing from the schema.
pub fn validate_schema(clusters: &[ClusterDef]) -> Result<()> {
    let mut ids = HashSet::new();
    let mut seen = HashSet::new();

    for cluster in clusters {
        if cluster.id.trim().is_empty() {
            return Err(Error::Schema("cluster with empty id".to_string()));
        }
        if !ids.insert(cluster.id) {
            return Err(Error::Schema(format!("duplicate cluster id: {}", cluster.id)));
        }
        if cluster.weight == 0 {
            return Err(Error::Schema(format!("cluster {} has zero weight", cluster.id)));
        }
        for metric in cluster.metrics {
            if !seen.insert(metric.key) {
                return Err(Error::Schema(format!(
                    "metric '{}' appears more than once",
                    metric.key
                )));
            }
        }
    }

    if let Some(missing) = MetricKey::ALL.iter().find(|key| !seen.contains(*key)) {
        return Err(Error::Schema(format!(
            "metric '{}' is not part of any cluster",
            missing
        )));
    }

    Ok(())
}

/// Cluster that owns a metric
pub fn cluster_of(key: MetricKey) -> Option<&'static ClusterDef> {
    CLUSTERS
        .iter()
        .find(|cluster| cluster.metrics.iter().any(|def| def.key == key))
}

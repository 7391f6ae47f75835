//! Merge and scoring engine
//!
//! - [`merge`]: provider results → metric updates (typed field maps, composites)
//! - [`scorer`]: cluster averages, total score, branded share
//! - [`stats`]: market-level summaries across competitors

pub mod merge;
pub mod scorer;
pub mod stats;

pub use merge::{merge_results, validate_field_maps, ProviderResults};
pub use scorer::{process_scores, scored};
pub use stats::{cluster_averages, most_branded, ranking, summarize, AuditSummary};

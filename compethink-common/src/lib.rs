//! # CompeThink Common Library
//!
//! Shared code for the competitive-intelligence sync engine:
//! - Metric schema (clusters, metric keys, provenance, scales)
//! - Data model (metrics, clusters, competitors, market audits)
//! - Entity factory
//! - Sync event types and EventBus
//! - Configuration loading
//! - Error types

pub mod config;
pub mod error;
pub mod events;
pub mod model;
pub mod schema;

pub use error::{Error, Result};
pub use model::{Cluster, Competitor, MarketAudit, Metric};
pub use schema::{MetricKey, Provenance};

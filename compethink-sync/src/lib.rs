//! compethink-sync library interface
//!
//! Sync engine for competitive-intelligence audits: resilient provider
//! fetching, result merging, scoring and audit persistence. Exposed as a
//! library for the `compethink` binary and for integration testing.

pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod orchestrator;
pub mod providers;
pub mod scoring;
pub mod session;

pub use crate::error::{SyncError, SyncResult};
pub use crate::orchestrator::{BatchReport, EntityReport, EntityStatus, SyncOrchestrator, SyncOutcome};
pub use crate::session::{AuditSession, EntityPatch};

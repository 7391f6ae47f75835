//! Sync engine errors

use thiserror::Error;
use uuid::Uuid;

/// Errors that stop a sync request before or outside per-competitor work
#[derive(Debug, Error)]
pub enum SyncError {
    /// Batch sync needs the SEO-metrics credential
    #[error("SEO API key is not configured")]
    MissingCredential,

    #[error("Audit has no competitors to synchronize")]
    EmptyCollection,

    #[error("Competitor not found: {0}")]
    UnknownEntity(Uuid),

    #[error(transparent)]
    Common(#[from] compethink_common::Error),
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;

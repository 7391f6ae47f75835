//! Audit persistence
//!
//! Two fixed keys in the settings table:
//! - `current_session`: the live audit
//! - `audit_history`: JSON array of snapshots, newest first, at most
//!   [`MAX_HISTORY_ENTRIES`] long (oldest evicted)

use super::settings::{get_json, set_json};
use super::{init_database_pool, init_memory_pool};
use compethink_common::model::MarketAudit;
use compethink_common::{Error, Result};
use sqlx::SqlitePool;
use std::path::Path;

pub const CURRENT_SESSION_KEY: &str = "current_session";
pub const HISTORY_KEY: &str = "audit_history";
pub const MAX_HISTORY_ENTRIES: usize = 20;

/// Store for the current audit and its snapshot history
#[derive(Debug, Clone)]
pub struct AuditStore {
    db: SqlitePool,
}

impl AuditStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Open (or create) the database file
    pub async fn open(db_path: &Path) -> Result<Self> {
        Ok(Self::new(init_database_pool(db_path).await?))
    }

    /// Throwaway in-memory store
    pub async fn in_memory() -> Result<Self> {
        Ok(Self::new(init_memory_pool().await?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    /// Persist the current audit
    pub async fn save(&self, audit: &MarketAudit) -> Result<()> {
        set_json(&self.db, CURRENT_SESSION_KEY, audit).await
    }

    pub async fn load_current(&self) -> Result<Option<MarketAudit>> {
        get_json(&self.db, CURRENT_SESSION_KEY).await
    }

    /// Snapshots, newest first; empty when none were ever taken
    pub async fn load_history(&self) -> Result<Vec<MarketAudit>> {
        Ok(get_json(&self.db, HISTORY_KEY).await?.unwrap_or_default())
    }

    pub async fn replace_history(&self, history: &[MarketAudit]) -> Result<()> {
        set_json(&self.db, HISTORY_KEY, &history).await
    }

    /// Insert `snapshot` at the front and evict beyond `max_entries`
    ///
    /// Returns the stored history.
    pub async fn append_history(
        &self,
        snapshot: MarketAudit,
        max_entries: usize,
    ) -> Result<Vec<MarketAudit>> {
        let mut history = self.load_history().await?;
        history.insert(0, snapshot);
        if history.len() > max_entries {
            tracing::debug!(evicted = history.len() - max_entries, "Evicting oldest snapshots");
            history.truncate(max_entries);
        }
        self.replace_history(&history).await?;
        Ok(history)
    }

    /// Remove the snapshot at `index` (0 = newest)
    pub async fn remove_history(&self, index: usize) -> Result<Vec<MarketAudit>> {
        let mut history = self.load_history().await?;
        if index >= history.len() {
            return Err(Error::NotFound(format!("history entry {index}")));
        }
        history.remove(index);
        self.replace_history(&history).await?;
        Ok(history)
    }
}

//! Audit session state
//!
//! [`AuditSession`] owns the live [`MarketAudit`] and its snapshot history.
//! Every mutation edits a copy of the audit and only makes it current once the
//! store has accepted it, so the store always mirrors what callers can read
//! through [`AuditSession::current`], failed saves included.

use crate::db::store::{AuditStore, MAX_HISTORY_ENTRIES};
use crate::scoring::process_scores;
use chrono::Utc;
use compethink_common::model::{Competitor, MarketAudit, DEFAULT_COMPETITOR_NAME};
use compethink_common::schema::MetricKey;
use compethink_common::{Error, Result};
use uuid::Uuid;

/// Partial update of a competitor's user-editable fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityPatch {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub organic_traffic: Option<u64>,
    pub branded_traffic: Option<u64>,
}

impl EntityPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn apply(self, competitor: &mut Competitor) {
        if let Some(name) = self.name {
            competitor.name = name;
        }
        if let Some(domain) = self.domain {
            competitor.domain = domain.trim().to_string();
        }
        if let Some(traffic) = self.organic_traffic {
            competitor.organic_traffic = traffic;
        }
        if let Some(traffic) = self.branded_traffic {
            competitor.branded_traffic = traffic;
        }
    }
}

/// Live audit plus history, backed by an [`AuditStore`]
pub struct AuditSession {
    audit: MarketAudit,
    history: Vec<MarketAudit>,
    store: AuditStore,
}

impl AuditSession {
    /// Restore the last session from the store, or start a fresh one
    pub async fn open(store: AuditStore) -> Result<Self> {
        let audit = match store.load_current().await? {
            Some(audit) => {
                tracing::info!(
                    client = %audit.client_name,
                    competitors = audit.competitors.len(),
                    "Restored audit session"
                );
                audit
            }
            None => {
                tracing::info!("No saved session, starting a new audit");
                MarketAudit::default()
            }
        };
        let history = store.load_history().await?;

        Ok(Self {
            audit,
            history,
            store,
        })
    }

    pub fn current(&self) -> &MarketAudit {
        &self.audit
    }

    /// Snapshots, newest first
    pub fn history(&self) -> &[MarketAudit] {
        &self.history
    }

    pub fn store(&self) -> &AuditStore {
        &self.store
    }

    /// Copy of the current audit to edit, stamped with the edit time
    fn draft(&self) -> MarketAudit {
        let mut next = self.audit.clone();
        next.last_updated = Utc::now();
        next
    }

    /// Store `next` and make it current; on error nothing changes
    async fn commit(&mut self, next: MarketAudit) -> Result<()> {
        self.store.save(&next).await?;
        self.audit = next;
        Ok(())
    }

    pub async fn set_client(&mut self, client_name: impl Into<String>, industry: impl Into<String>) -> Result<()> {
        let mut next = self.draft();
        next.client_name = client_name.into();
        next.industry = industry.into();
        self.commit(next).await
    }

    /// Store the SEO-metrics credential (trimmed)
    pub async fn set_api_key(&mut self, api_key: &str) -> Result<()> {
        let mut next = self.draft();
        next.api_key = api_key.trim().to_string();
        self.commit(next).await
    }

    /// Append a competitor built from the schema; returns its id
    pub async fn add_entity(&mut self, name: &str, domain: &str) -> Result<Uuid> {
        let name = if name.trim().is_empty() {
            DEFAULT_COMPETITOR_NAME
        } else {
            name.trim()
        };
        let competitor = Competitor::new(name, domain.trim());
        let id = competitor.id;

        let mut next = self.draft();
        next.competitors.push(competitor);
        self.commit(next).await?;

        tracing::debug!(%id, name, "Competitor added");
        Ok(id)
    }

    pub async fn update_entity(&mut self, id: Uuid, patch: EntityPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let mut next = self.draft();
        let competitor = competitor_mut(&mut next, id)?;
        patch.apply(competitor);
        process_scores(competitor);
        self.commit(next).await
    }

    /// Manual metric edit
    ///
    /// Hand-rated metrics only accept values on their scale; other metrics are
    /// clamped to 0-100.
    pub async fn set_metric_score(&mut self, id: Uuid, key: MetricKey, score: u32) -> Result<()> {
        if let Some(scale) = key.scale() {
            if !scale.contains(score) {
                return Err(Error::InvalidInput(format!(
                    "{score} is not a valid rating for '{key}' (allowed: {:?})",
                    scale.values()
                )));
            }
        }

        let mut next = self.draft();
        let competitor = competitor_mut(&mut next, id)?;
        let metric = competitor
            .metric_mut(key)
            .ok_or_else(|| Error::Schema(format!("competitor has no '{key}' metric")))?;
        metric.score = score.min(100);
        process_scores(competitor);
        self.commit(next).await
    }

    pub async fn remove_entity(&mut self, id: Uuid) -> Result<()> {
        if self.audit.competitor(id).is_none() {
            return Err(Error::NotFound(format!("competitor {id}")));
        }
        let mut next = self.draft();
        next.competitors.retain(|c| c.id != id);
        self.commit(next).await
    }

    /// Replace a competitor with an updated copy
    ///
    /// The competitor list is rebuilt rather than edited in place.
    pub async fn replace_entity(&mut self, updated: Competitor) -> Result<()> {
        if self.audit.competitor(updated.id).is_none() {
            return Err(Error::NotFound(format!("competitor {}", updated.id)));
        }
        let mut next = self.draft();
        next.competitors = self
            .audit
            .competitors
            .iter()
            .map(|c| if c.id == updated.id { updated.clone() } else { c.clone() })
            .collect();
        self.commit(next).await
    }

    /// Push a deep copy of the current audit into history
    pub async fn snapshot(&mut self) -> Result<()> {
        let snapshot = self.draft();
        self.history = self.store.append_history(snapshot, MAX_HISTORY_ENTRIES).await?;
        tracing::info!(entries = self.history.len(), "Audit snapshot saved");
        Ok(())
    }

    /// Make a copy of history entry `index` the current audit
    pub async fn load_from_history(&mut self, index: usize) -> Result<()> {
        let entry = self
            .history
            .get(index)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("history entry {index}")))?;
        self.commit(entry).await
    }

    pub async fn remove_from_history(&mut self, index: usize) -> Result<()> {
        self.history = self.store.remove_history(index).await?;
        Ok(())
    }

    /// Start over with a fresh audit, keeping the credential
    ///
    /// An audit holding data is snapshotted first.
    pub async fn new_analysis(&mut self) -> Result<()> {
        if self.audit.has_data() {
            self.snapshot().await?;
        }
        self.commit(MarketAudit::new(self.audit.api_key.clone())).await
    }
}

fn competitor_mut(audit: &mut MarketAudit, id: Uuid) -> Result<&mut Competitor> {
    audit
        .competitor_mut(id)
        .ok_or_else(|| Error::NotFound(format!("competitor {id}")))
}

//! Sync orchestration
//!
//! Single-competitor sync runs the performance audit first (the composites
//! need it), then the SEO and AI adapters concurrently, then merges and
//! rescores. Batch sync walks a queue of competitor ids one at a time so the
//! rate-limited providers never see parallel requests from us; each result
//! is persisted before the next competitor starts, and one competitor's
//! failure is recorded without stopping the batch.

use crate::error::{SyncError, SyncResult};
use crate::providers::Providers;
use crate::scoring::{merge_results, validate_field_maps, ProviderResults};
use crate::session::AuditSession;
use compethink_common::events::{progress_percentage, EventBus, SyncEvent};
use compethink_common::model::Competitor;
use compethink_common::schema::{validate_schema, CLUSTERS};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Instant;
use uuid::Uuid;

/// Result of synchronizing one competitor
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Merged and rescored copy of the competitor
    Updated(Competitor),
    /// Nothing to fetch (no resolvable domain)
    NothingToDo(String),
    /// No usable data; the competitor must be left as it was
    Failed(String),
}

/// Per-competitor status in a [`BatchReport`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntityStatus {
    Synced { total_score: u32 },
    Skipped { reason: String },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityReport {
    pub id: Uuid,
    pub name: String,
    #[serde(flatten)]
    pub status: EntityStatus,
}

/// Outcome of a batch sync, in processing order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub entries: Vec<EntityReport>,
}

impl BatchReport {
    fn count(&self, pred: impl Fn(&EntityStatus) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.status)).count()
    }

    pub fn synced(&self) -> usize {
        self.count(|s| matches!(s, EntityStatus::Synced { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, EntityStatus::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, EntityStatus::Failed { .. }))
    }

    /// Failed competitors, for the user-facing alert
    pub fn failures(&self) -> impl Iterator<Item = &EntityReport> {
        self.entries
            .iter()
            .filter(|e| matches!(e.status, EntityStatus::Failed { .. }))
    }
}

/// Drives providers, merge and persistence for one audit session
pub struct SyncOrchestrator {
    providers: Providers,
    events: EventBus,
}

impl SyncOrchestrator {
    /// Create an orchestrator after checking the schema and provider field maps
    pub fn new(providers: Providers, events: EventBus) -> SyncResult<Self> {
        validate_schema(CLUSTERS)?;
        validate_field_maps()?;
        Ok(Self { providers, events })
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Fetch and merge fresh data for one competitor
    ///
    /// Never touches the input; a [`SyncOutcome::Updated`] carries the new copy.
    pub async fn sync_competitor(&self, competitor: &Competitor, api_key: &str) -> SyncOutcome {
        let Some(domain) = competitor.resolved_domain() else {
            tracing::debug!(competitor = %competitor.name, "No domain, nothing to sync");
            return SyncOutcome::NothingToDo("no domain configured".to_string());
        };

        let started = Instant::now();
        tracing::info!(competitor = %competitor.name, domain = %domain, "Syncing competitor");

        let performance = self.providers.performance.audit(&competitor.domain).await;
        let (seo, ai) = tokio::join!(
            self.providers.seo.fetch_metrics(&domain, api_key),
            self.providers.ai.assess(&domain, performance.as_ref()),
        );

        let results = ProviderResults {
            seo,
            ai,
            performance,
        };
        if results.is_empty() {
            tracing::warn!(domain = %domain, "No provider returned data");
            return SyncOutcome::Failed(format!("no provider returned data for {domain}"));
        }

        let updated = merge_results(competitor, &results);
        tracing::info!(
            domain = %domain,
            seo = results.seo.is_some(),
            ai = results.ai.is_some(),
            performance = results.performance.is_some(),
            total_score = updated.total_score,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Competitor synced"
        );
        SyncOutcome::Updated(updated)
    }

    /// Sync one competitor of the session and store the result
    ///
    /// Works without an SEO credential (that adapter is skipped).
    pub async fn sync_one(&self, session: &mut AuditSession, id: Uuid) -> SyncResult<SyncOutcome> {
        let competitor = session
            .current()
            .competitor(id)
            .cloned()
            .ok_or(SyncError::UnknownEntity(id))?;
        let api_key = session.current().api_key.trim().to_string();

        let status = self.run_entity(session, &competitor, &api_key).await;
        let outcome = match status {
            EntityStatus::Synced { .. } => session
                .current()
                .competitor(id)
                .cloned()
                .map(SyncOutcome::Updated)
                .ok_or(SyncError::UnknownEntity(id))?,
            EntityStatus::Skipped { reason } => SyncOutcome::NothingToDo(reason),
            EntityStatus::Failed { message } => SyncOutcome::Failed(message),
        };
        Ok(outcome)
    }

    /// Sync every competitor in order, persisting after each one
    ///
    /// Fails fast, before any network call, when the audit is empty or has
    /// no SEO credential. Ends with a history snapshot.
    pub async fn sync_batch(&self, session: &mut AuditSession) -> SyncResult<BatchReport> {
        let audit = session.current();
        if audit.competitors.is_empty() {
            return Err(SyncError::EmptyCollection);
        }
        if !audit.has_credential() {
            return Err(SyncError::MissingCredential);
        }
        let api_key = audit.api_key.trim().to_string();

        let mut queue: VecDeque<Uuid> = audit.competitors.iter().map(|c| c.id).collect();
        let total = queue.len();
        let started = Instant::now();

        tracing::info!(total, "Batch sync started");
        self.events.emit(SyncEvent::BatchStarted { total });

        let mut report = BatchReport::default();
        while let Some(id) = queue.pop_front() {
            let status = match session.current().competitor(id).cloned() {
                Some(competitor) => {
                    let status = self.run_entity(session, &competitor, &api_key).await;
                    report.entries.push(EntityReport {
                        id,
                        name: competitor.name,
                        status: status.clone(),
                    });
                    status
                }
                None => EntityStatus::Skipped {
                    reason: "competitor removed".to_string(),
                },
            };
            if let EntityStatus::Failed { message } = &status {
                tracing::warn!(%id, %message, "Competitor failed, continuing batch");
            }

            let completed = total - queue.len();
            self.events.emit(SyncEvent::Progress {
                completed,
                total,
                percentage: progress_percentage(completed, total),
            });
        }

        if let Err(e) = session.snapshot().await {
            tracing::error!(error = %e, "Failed to snapshot audit after batch sync");
        }

        tracing::info!(
            synced = report.synced(),
            failed = report.failed(),
            skipped = report.skipped(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch sync complete"
        );
        self.events.emit(SyncEvent::BatchCompleted {
            synced: report.synced(),
            failed: report.failed(),
            skipped: report.skipped(),
        });
        Ok(report)
    }

    /// Sync, store and report one competitor
    async fn run_entity(
        &self,
        session: &mut AuditSession,
        competitor: &Competitor,
        api_key: &str,
    ) -> EntityStatus {
        let id = competitor.id;
        self.events.emit(SyncEvent::EntityStarted {
            id,
            name: competitor.name.clone(),
        });

        let status = match self.sync_competitor(competitor, api_key).await {
            SyncOutcome::Updated(updated) => {
                let total_score = updated.total_score;
                match session.replace_entity(updated).await {
                    Ok(()) => EntityStatus::Synced { total_score },
                    Err(e) => EntityStatus::Failed {
                        message: format!("could not store result: {e}"),
                    },
                }
            }
            SyncOutcome::NothingToDo(reason) => EntityStatus::Skipped { reason },
            SyncOutcome::Failed(message) => EntityStatus::Failed { message },
        };

        let event = match &status {
            EntityStatus::Synced { total_score } => SyncEvent::EntitySynced {
                id,
                total_score: *total_score,
            },
            EntityStatus::Skipped { reason } => SyncEvent::EntitySkipped {
                id,
                reason: reason.clone(),
            },
            EntityStatus::Failed { message } => SyncEvent::EntityFailed {
                id,
                message: message.clone(),
            },
        };
        self.events.emit(event);
        status
    }
}

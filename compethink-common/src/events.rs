//! Sync event types and EventBus
//!
//! The orchestrator reports batch progress by emitting [`SyncEvent`]s on an
//! [`EventBus`]. Any number of observers (the CLI progress printer, tests) can
//! subscribe; emitting with nobody listening is not an error.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events emitted while synchronizing competitors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SyncEvent {
    /// Batch sync accepted its preconditions and is about to start
    BatchStarted { total: usize },

    /// One competitor is being synchronized
    EntityStarted { id: Uuid, name: String },

    /// Competitor updated and rescored
    EntitySynced { id: Uuid, total_score: u32 },

    /// Nothing to do for this competitor (e.g. no resolvable domain)
    EntitySkipped { id: Uuid, reason: String },

    /// Competitor left unmodified after an unrecoverable error
    EntityFailed { id: Uuid, message: String },

    /// Fractional batch progress, emitted after each competitor
    Progress {
        completed: usize,
        total: usize,
        /// round(100 * completed / total)
        percentage: u32,
    },

    /// Batch ran to completion
    BatchCompleted {
        synced: usize,
        failed: usize,
        skipped: usize,
    },
}

/// Rounded completion percentage; 0 for an empty batch
pub fn progress_percentage(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u32
}

/// Broadcast channel for [`SyncEvent`]s
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all current subscribers
    ///
    /// Returns the number of subscribers that received it (0 when nobody listens).
    pub fn emit(&self, event: SyncEvent) -> usize {
        match self.tx.send(event) {
            Ok(count) => count,
            Err(_) => {
                tracing::trace!("Sync event dropped: no subscribers");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

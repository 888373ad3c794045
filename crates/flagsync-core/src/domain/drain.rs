//! Drain pass results and sync status views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Drain lifecycle.
///
/// State transitions:
/// - Idle -> Draining -> Idle
///
/// A trigger that arrives while `Draining` is absorbed, not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainState {
    Idle,
    Draining,
}

/// Counts for one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainSummary {
    /// Records handed to the transport.
    pub attempted: usize,

    /// Records delivered and removed from the store.
    pub delivered: usize,

    /// Records that stayed queued with `retry_count` bumped.
    pub failed: usize,

    /// Records skipped because they hit the retry cap (still queued).
    pub parked: usize,
}

impl DrainSummary {
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.parked == 0
    }
}

/// Result of asking the drainer to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DrainOutcome {
    /// A pass ran to completion.
    Completed(DrainSummary),

    /// Another pass was already in flight; nothing was done.
    AlreadyRunning,
}

impl DrainOutcome {
    pub fn summary(&self) -> Option<&DrainSummary> {
        match self {
            DrainOutcome::Completed(summary) => Some(summary),
            DrainOutcome::AlreadyRunning => None,
        }
    }
}

/// Snapshot for a pending-items badge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatus {
    pub online: bool,
    pub queue_depth: usize,
    pub state: DrainState,

    /// When the last pass that delivered everything it attempted finished.
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_summary: Option<DrainSummary>,
}

use crate::domain::value_objects::{SyncOperationKind, SyncQueueId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainTrigger {
    Startup,
    Timer,
    Reconnected,
    Manual,
}

impl DrainTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrainTrigger::Startup => "startup",
            DrainTrigger::Timer => "timer",
            DrainTrigger::Reconnected => "reconnected",
            DrainTrigger::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Offline,
    NoSession,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayFailure {
    pub entry_id: SyncQueueId,
    pub kind: SyncOperationKind,
    pub message: String,
}

/// Outcome of one pass over the pending queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    pub trigger: DrainTrigger,
    pub skipped: Option<SkipReason>,
    pub attempted: u32,
    pub synced: u32,
    pub failed: u32,
    pub cleaned: u64,
    pub failures: Vec<ReplayFailure>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl DrainReport {
    pub fn started(trigger: DrainTrigger, started_at: DateTime<Utc>) -> Self {
        Self {
            trigger,
            skipped: None,
            attempted: 0,
            synced: 0,
            failed: 0,
            cleaned: 0,
            failures: Vec::new(),
            started_at,
            duration_ms: 0,
        }
    }

    pub fn skipped(trigger: DrainTrigger, reason: SkipReason, started_at: DateTime<Utc>) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::started(trigger, started_at)
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }
}

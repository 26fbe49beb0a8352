use crate::domain::entities::{DrainReport, DrainTrigger};
use serde::Serialize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DrainOutcomeStatus {
    /// Every attempted entry was confirmed.
    Success,
    /// At least one entry stayed pending, or the pass itself failed.
    Failure,
    Skipped,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetricsSnapshot {
    pub total_drains: u64,
    pub total_synced: u64,
    pub total_failed: u64,
    pub total_cleaned: u64,
    pub consecutive_failure: u64,
    pub last_success_ms: Option<u64>,
    pub last_failure_ms: Option<u64>,
    pub last_outcome: Option<DrainOutcomeStatus>,
    pub last_trigger: Option<DrainTrigger>,
    pub last_duration_ms: Option<u64>,
    pub last_error: Option<String>,
}

#[derive(Default, Clone)]
struct LastDrainMetadata {
    outcome: Option<DrainOutcomeStatus>,
    trigger: Option<DrainTrigger>,
    duration_ms: Option<u64>,
    error: Option<String>,
}

/// Running counters over drain passes. One instance per engine.
pub struct SyncMetrics {
    drains: AtomicU64,
    synced: AtomicU64,
    failed: AtomicU64,
    cleaned: AtomicU64,
    consecutive_failure: AtomicU64,
    last_success_ms: AtomicU64,
    last_failure_ms: AtomicU64,
    metadata: Mutex<LastDrainMetadata>,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self {
            drains: AtomicU64::new(0),
            synced: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            cleaned: AtomicU64::new(0),
            consecutive_failure: AtomicU64::new(0),
            last_success_ms: AtomicU64::new(0),
            last_failure_ms: AtomicU64::new(0),
            metadata: Mutex::new(LastDrainMetadata::default()),
        }
    }

    pub fn record_report(&self, report: &DrainReport) -> SyncMetricsSnapshot {
        let status = if report.is_skipped() {
            DrainOutcomeStatus::Skipped
        } else if report.failed > 0 {
            DrainOutcomeStatus::Failure
        } else {
            DrainOutcomeStatus::Success
        };

        if status != DrainOutcomeStatus::Skipped {
            self.drains.fetch_add(1, Ordering::Relaxed);
            self.synced
                .fetch_add(u64::from(report.synced), Ordering::Relaxed);
            self.failed
                .fetch_add(u64::from(report.failed), Ordering::Relaxed);
            self.cleaned.fetch_add(report.cleaned, Ordering::Relaxed);
        }
        match status {
            DrainOutcomeStatus::Success => self.mark_success(),
            DrainOutcomeStatus::Failure => self.mark_failure(),
            DrainOutcomeStatus::Skipped => {}
        }

        let error = report.failures.first().map(|failure| failure.message.clone());
        self.store_metadata(LastDrainMetadata {
            outcome: Some(status),
            trigger: Some(report.trigger),
            duration_ms: Some(report.duration_ms),
            error,
        });
        self.snapshot()
    }

    /// A pass that could not run to completion, e.g. the local store was unreadable.
    pub fn record_error(&self, trigger: DrainTrigger, error: &str) -> SyncMetricsSnapshot {
        self.drains.fetch_add(1, Ordering::Relaxed);
        self.mark_failure();
        self.store_metadata(LastDrainMetadata {
            outcome: Some(DrainOutcomeStatus::Failure),
            trigger: Some(trigger),
            duration_ms: None,
            error: Some(error.to_string()),
        });
        self.snapshot()
    }

    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        let metadata = self
            .metadata
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|_| LastDrainMetadata::default());

        SyncMetricsSnapshot {
            total_drains: self.drains.load(Ordering::Relaxed),
            total_synced: self.synced.load(Ordering::Relaxed),
            total_failed: self.failed.load(Ordering::Relaxed),
            total_cleaned: self.cleaned.load(Ordering::Relaxed),
            consecutive_failure: self.consecutive_failure.load(Ordering::Relaxed),
            last_success_ms: to_option(self.last_success_ms.load(Ordering::Relaxed)),
            last_failure_ms: to_option(self.last_failure_ms.load(Ordering::Relaxed)),
            last_outcome: metadata.outcome,
            last_trigger: metadata.trigger,
            last_duration_ms: metadata.duration_ms,
            last_error: metadata.error,
        }
    }

    fn mark_success(&self) {
        self.last_success_ms
            .store(current_unix_ms(), Ordering::Relaxed);
        self.consecutive_failure.store(0, Ordering::Relaxed);
    }

    fn mark_failure(&self) {
        self.last_failure_ms
            .store(current_unix_ms(), Ordering::Relaxed);
        self.consecutive_failure.fetch_add(1, Ordering::Relaxed);
    }

    fn store_metadata(&self, metadata: LastDrainMetadata) {
        if let Ok(mut guard) = self.metadata.lock() {
            *guard = metadata;
        }
    }
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn to_option(value: u64) -> Option<u64> {
    if value == 0 { None } else { Some(value) }
}

fn current_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}

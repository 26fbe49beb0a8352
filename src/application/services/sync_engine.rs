use crate::application::ports::connectivity::ConnectivityService;
use crate::application::ports::offline_store::OfflineStore;
use crate::application::ports::session::SessionProvider;
use crate::application::services::remote_applier::RemoteApplier;
use crate::domain::entities::{
    AuthSession, DrainReport, DrainTrigger, ReplayFailure, SkipReason, SyncQueueEntry,
};
use crate::infrastructure::offline::metrics::{SyncMetrics, SyncMetricsSnapshot};
use crate::shared::error::AppError;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// Drives pending queue entries to the remote store.
///
/// Passes are serialized by `gate`: a pass that starts while another is running waits for it
/// and then only sees what is still pending.
pub struct SyncEngine {
    store: Arc<dyn OfflineStore>,
    applier: Arc<RemoteApplier>,
    connectivity: Arc<dyn ConnectivityService>,
    session: Arc<dyn SessionProvider>,
    metrics: Arc<SyncMetrics>,
    gate: Mutex<()>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn OfflineStore>,
        applier: Arc<RemoteApplier>,
        connectivity: Arc<dyn ConnectivityService>,
        session: Arc<dyn SessionProvider>,
    ) -> Self {
        Self {
            store,
            applier,
            connectivity,
            session,
            metrics: Arc::new(SyncMetrics::new()),
            gate: Mutex::new(()),
        }
    }

    pub fn metrics(&self) -> SyncMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub async fn pending_count(&self) -> Result<u64, AppError> {
        self.store.pending_count().await
    }

    pub async fn drain(&self, trigger: DrainTrigger) -> Result<DrainReport, AppError> {
        let _guard = self.gate.lock().await;
        let started_at = Utc::now();
        let clock = Instant::now();

        if !self.connectivity.current() {
            tracing::debug!(
                target: "sync::engine",
                trigger = trigger.as_str(),
                "skipping drain while offline"
            );
            let report = DrainReport::skipped(trigger, SkipReason::Offline, started_at);
            self.metrics.record_report(&report);
            return Ok(report);
        }
        let Some(session) = self.session.current() else {
            tracing::debug!(
                target: "sync::engine",
                trigger = trigger.as_str(),
                "skipping drain without a signed-in session"
            );
            let report = DrainReport::skipped(trigger, SkipReason::NoSession, started_at);
            self.metrics.record_report(&report);
            return Ok(report);
        };

        match self.run_pass(trigger, &session, started_at).await {
            Ok(mut report) => {
                report.duration_ms = clock.elapsed().as_millis() as u64;
                self.metrics.record_report(&report);
                tracing::info!(
                    target: "sync::engine",
                    trigger = trigger.as_str(),
                    attempted = report.attempted,
                    synced = report.synced,
                    failed = report.failed,
                    cleaned = report.cleaned,
                    duration_ms = report.duration_ms,
                    "drain completed"
                );
                Ok(report)
            }
            Err(err) => {
                self.metrics.record_error(trigger, &err.to_string());
                tracing::error!(
                    target: "sync::engine",
                    trigger = trigger.as_str(),
                    error = %err,
                    "drain aborted"
                );
                Err(err)
            }
        }
    }

    async fn run_pass(
        &self,
        trigger: DrainTrigger,
        session: &AuthSession,
        started_at: chrono::DateTime<Utc>,
    ) -> Result<DrainReport, AppError> {
        let pending = self.store.pending_entries().await?;
        let mut report = DrainReport::started(trigger, started_at);
        tracing::debug!(
            target: "sync::engine",
            pending = pending.len(),
            "replaying pending entries"
        );

        for entry in &pending {
            report.attempted += 1;
            let outcome = match self.replay(entry, session).await {
                Ok(()) => self.store.mark_synced(entry.id).await,
                Err(err) => Err(err),
            };
            match outcome {
                Ok(()) => {
                    report.synced += 1;
                    tracing::debug!(
                        target: "sync::engine",
                        entry_id = %entry.id,
                        kind = %entry.kind,
                        "entry synced"
                    );
                }
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(
                        target: "sync::engine",
                        entry_id = %entry.id,
                        kind = %entry.kind,
                        transient = err.is_transient(),
                        error = %err,
                        "entry replay failed; will retry on next drain"
                    );
                    report.failures.push(ReplayFailure {
                        entry_id: entry.id,
                        kind: entry.kind,
                        message: err.to_string(),
                    });
                }
            }
        }

        report.cleaned = self.store.clear_synced().await?;
        Ok(report)
    }

    async fn replay(&self, entry: &SyncQueueEntry, session: &AuthSession) -> Result<(), AppError> {
        if entry.organization_id != session.organization_id {
            return Err(AppError::Unauthorized(format!(
                "entry {} belongs to organization {}",
                entry.id, entry.organization_id
            )));
        }
        let operation = entry.operation()?;
        self.applier.apply(&operation).await
    }
}

use crate::application::ports::offline_store::OfflineStore;
use crate::domain::entities::{SyncOperation, SyncQueueEntry};
use crate::domain::value_objects::{SyncOperationKind, SyncPayload};
use crate::shared::error::AppError;
use std::sync::Arc;

/// Records transactions for later replay. Never touches the network.
pub struct SyncQueueWriter {
    store: Arc<dyn OfflineStore>,
}

impl SyncQueueWriter {
    pub fn new(store: Arc<dyn OfflineStore>) -> Self {
        Self { store }
    }

    /// Queues a raw payload after checking it decodes into a complete `kind` operation.
    pub async fn enqueue(
        &self,
        kind: SyncOperationKind,
        payload: SyncPayload,
    ) -> Result<SyncQueueEntry, AppError> {
        let operation = SyncOperation::decode(kind, &payload)?;
        self.enqueue_operation(&operation).await
    }

    pub async fn enqueue_operation(
        &self,
        operation: &SyncOperation,
    ) -> Result<SyncQueueEntry, AppError> {
        operation.validate()?;
        let entry = self.store.enqueue(operation).await.inspect_err(|err| {
            tracing::error!(
                target: "sync::queue",
                kind = %operation.kind(),
                error = %err,
                "failed to persist sync queue entry"
            );
        })?;
        tracing::info!(
            target: "sync::queue",
            entry_id = %entry.id,
            kind = %entry.kind,
            organization_id = %entry.organization_id,
            "queued operation for replay"
        );
        Ok(entry)
    }

    pub async fn pending_count(&self) -> Result<u64, AppError> {
        self.store.pending_count().await
    }
}

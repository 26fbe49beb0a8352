use super::sync_operation::SyncOperation;
use crate::domain::value_objects::{SyncOperationKind, SyncPayload, SyncQueueId};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Durable record of one not-yet-confirmed remote operation. Only `synced` (and its timestamp)
/// ever changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncQueueEntry {
    pub id: SyncQueueId,
    pub kind: SyncOperationKind,
    pub payload: SyncPayload,
    pub organization_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub synced: bool,
    pub synced_at: Option<DateTime<Utc>>,
}

impl SyncQueueEntry {
    pub fn operation(&self) -> Result<SyncOperation, AppError> {
        SyncOperation::decode(self.kind, &self.payload)
    }
}

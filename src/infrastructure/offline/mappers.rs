use super::rows::{CachedDocumentRow, InventoryItemRow, SyncQueueRow};
use crate::domain::entities::{InventoryItem, SyncQueueEntry};
use crate::domain::value_objects::{Quantity, SyncOperationKind, SyncPayload, SyncQueueId};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::str::FromStr;
use uuid::Uuid;

pub fn sync_queue_entry_from_row(row: SyncQueueRow) -> Result<SyncQueueEntry, AppError> {
    Ok(SyncQueueEntry {
        id: SyncQueueId::new(row.id).map_err(AppError::DeserializationError)?,
        kind: SyncOperationKind::from_str(&row.kind).map_err(AppError::DeserializationError)?,
        payload: SyncPayload::from_json_str(&row.payload)
            .map_err(AppError::DeserializationError)?,
        organization_id: Uuid::parse_str(&row.organization_id)?,
        created_at: timestamp_to_datetime(row.created_at),
        synced: row.synced,
        synced_at: row.synced_at.map(timestamp_to_datetime),
    })
}

pub fn inventory_item_from_row(row: InventoryItemRow) -> Result<InventoryItem, AppError> {
    Ok(InventoryItem {
        id: Uuid::parse_str(&row.id)?,
        product_id: Uuid::parse_str(&row.product_id)?,
        store_id: Uuid::parse_str(&row.store_id)?,
        quantity: Quantity::from_milli(row.quantity_milli)
            .map_err(AppError::DeserializationError)?,
        organization_id: Uuid::parse_str(&row.organization_id)?,
        created_at: timestamp_to_datetime(row.created_at),
        updated_at: timestamp_to_datetime(row.updated_at),
    })
}

pub fn document_from_row<T: DeserializeOwned>(row: CachedDocumentRow) -> Result<T, AppError> {
    serde_json::from_str(&row.data).map_err(|err| {
        AppError::DeserializationError(format!("cached record {}: {err}", row.id))
    })
}

pub fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ts).unwrap_or_else(Utc::now)
}

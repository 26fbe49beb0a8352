use crate::domain::entities::{
    Customer, InventoryItem, Product, Sale, SaleItem, SyncOperation, SyncQueueEntry,
};
use crate::domain::value_objects::SyncQueueId;
use crate::shared::error::AppError;
use async_trait::async_trait;
use uuid::Uuid;

/// Durable device-local store: the sync queue plus the read caches used while offline.
#[async_trait]
pub trait OfflineStore: Send + Sync {
    /// Persists `operation` as a new pending entry. The local cache effects of the operation
    /// commit in the same transaction, so either both are visible or neither is.
    async fn enqueue(&self, operation: &SyncOperation) -> Result<SyncQueueEntry, AppError>;
    /// Unsynced entries in id order.
    async fn pending_entries(&self) -> Result<Vec<SyncQueueEntry>, AppError>;
    async fn pending_count(&self) -> Result<u64, AppError>;
    async fn mark_synced(&self, id: SyncQueueId) -> Result<(), AppError>;
    /// Deletes every synced entry and returns how many were removed.
    async fn clear_synced(&self) -> Result<u64, AppError>;

    async fn cache_products(&self, products: &[Product]) -> Result<(), AppError>;
    async fn cached_products(&self, organization_id: Uuid) -> Result<Vec<Product>, AppError>;
    async fn cache_customers(&self, customers: &[Customer]) -> Result<(), AppError>;
    async fn cached_customers(&self, organization_id: Uuid) -> Result<Vec<Customer>, AppError>;
    async fn cache_inventory_items(&self, items: &[InventoryItem]) -> Result<(), AppError>;
    async fn cached_inventory(
        &self,
        organization_id: Uuid,
        store_id: Option<Uuid>,
    ) -> Result<Vec<InventoryItem>, AppError>;
    async fn cached_sales(&self, organization_id: Uuid) -> Result<Vec<Sale>, AppError>;
    async fn cached_sale_items(&self, sale_id: Uuid) -> Result<Vec<SaleItem>, AppError>;
}

use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct SyncQueueRow {
    pub id: i64,
    pub kind: String,
    pub payload: String,
    pub organization_id: String,
    pub created_at: i64,
    pub synced: bool,
    pub synced_at: Option<i64>,
}

/// Cached remote record stored as its JSON document.
#[derive(Debug, Clone, FromRow)]
pub struct CachedDocumentRow {
    pub id: String,
    pub data: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct InventoryItemRow {
    pub id: String,
    pub organization_id: String,
    pub product_id: String,
    pub store_id: String,
    pub quantity_milli: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

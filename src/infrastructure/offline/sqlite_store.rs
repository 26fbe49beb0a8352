use super::mappers::{document_from_row, inventory_item_from_row, sync_queue_entry_from_row};
use super::rows::{CachedDocumentRow, InventoryItemRow, SyncQueueRow};
use crate::application::ports::offline_store::OfflineStore;
use crate::domain::entities::{
    Customer, InventoryItem, Product, Sale, SaleItem, SalePayload, SyncOperation, SyncQueueEntry,
};
use crate::domain::value_objects::SyncQueueId;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

pub struct SqliteOfflineStore {
    pool: SqlitePool,
}

impl SqliteOfflineStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn cache_sale(conn: &mut SqliteConnection, payload: &SalePayload) -> Result<(), AppError> {
        let sale = &payload.sale;
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO sales (id, organization_id, store_id, created_at, data)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(sale.id.to_string())
        .bind(sale.organization_id.to_string())
        .bind(sale.store_id.to_string())
        .bind(sale.created_at.timestamp_millis())
        .bind(serde_json::to_string(sale)?)
        .execute(&mut *conn)
        .await?;

        for item in &payload.items {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO sale_items (id, sale_id, product_id, data)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(item.id.to_string())
            .bind(item.sale_id.to_string())
            .bind(item.product_id.to_string())
            .bind(serde_json::to_string(item)?)
            .execute(&mut *conn)
            .await?;

            Self::apply_stock_delta(
                &mut *conn,
                item.product_id,
                sale.store_id,
                sale.organization_id,
                -item.quantity.milli_units(),
            )
            .await?;
        }
        Ok(())
    }

    /// Optimistic on-hand change; never drops below zero. A positive delta for an uncached
    /// product opens a cache row.
    async fn apply_stock_delta(
        conn: &mut SqliteConnection,
        product_id: Uuid,
        store_id: Uuid,
        organization_id: Uuid,
        delta_milli: i64,
    ) -> Result<(), AppError> {
        let now = Utc::now().timestamp_millis();
        let updated = sqlx::query(
            r#"
            UPDATE inventory_items
            SET quantity_milli = MAX(quantity_milli + ?1, 0), updated_at = ?2
            WHERE product_id = ?3 AND store_id = ?4
            "#,
        )
        .bind(delta_milli)
        .bind(now)
        .bind(product_id.to_string())
        .bind(store_id.to_string())
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if updated == 0 && delta_milli > 0 {
            sqlx::query(
                r#"
                INSERT INTO inventory_items
                    (id, organization_id, product_id, store_id, quantity_milli, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(organization_id.to_string())
            .bind(product_id.to_string())
            .bind(store_id.to_string())
            .bind(delta_milli)
            .bind(now)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl OfflineStore for SqliteOfflineStore {
    async fn enqueue(&self, operation: &SyncOperation) -> Result<SyncQueueEntry, AppError> {
        let payload = operation.to_payload()?;
        let payload_json = serde_json::to_string(payload.as_json())?;
        let created_at = Utc::now().timestamp_millis();

        let mut tx = self.pool.begin().await?;
        let id = sqlx::query(
            r#"
            INSERT INTO sync_queue (kind, payload, organization_id, created_at, synced)
            VALUES (?1, ?2, ?3, ?4, 0)
            "#,
        )
        .bind(operation.kind().as_str())
        .bind(&payload_json)
        .bind(operation.organization_id().to_string())
        .bind(created_at)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        match operation {
            SyncOperation::Sale(payload) => Self::cache_sale(&mut *tx, payload).await?,
            SyncOperation::Inventory(adjustment) => {
                Self::apply_stock_delta(
                    &mut *tx,
                    adjustment.product_id,
                    adjustment.store_id,
                    adjustment.organization_id,
                    adjustment.signed_milli(),
                )
                .await?
            }
            SyncOperation::Payment(_) => {}
        }

        let row = sqlx::query_as::<_, SyncQueueRow>(
            r#"
            SELECT id, kind, payload, organization_id, created_at, synced, synced_at
            FROM sync_queue
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        sync_queue_entry_from_row(row)
    }

    async fn pending_entries(&self) -> Result<Vec<SyncQueueEntry>, AppError> {
        let rows = sqlx::query_as::<_, SyncQueueRow>(
            r#"
            SELECT id, kind, payload, organization_id, created_at, synced, synced_at
            FROM sync_queue
            WHERE synced = 0
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(sync_queue_entry_from_row).collect()
    }

    async fn pending_count(&self) -> Result<u64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sync_queue WHERE synced = 0")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn mark_synced(&self, id: SyncQueueId) -> Result<(), AppError> {
        let updated = sqlx::query(
            r#"
            UPDATE sync_queue
            SET synced = 1, synced_at = ?1
            WHERE id = ?2 AND synced = 0
            "#,
        )
        .bind(Utc::now().timestamp_millis())
        .bind(id.value())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sync_queue WHERE id = ?1")
                .bind(id.value())
                .fetch_one(&self.pool)
                .await?;
            if exists == 0 {
                return Err(AppError::NotFound(format!("Sync queue entry {id}")));
            }
        }
        Ok(())
    }

    async fn clear_synced(&self) -> Result<u64, AppError> {
        let removed = sqlx::query("DELETE FROM sync_queue WHERE synced = 1")
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(removed)
    }

    async fn cache_products(&self, products: &[Product]) -> Result<(), AppError> {
        let now = Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await?;
        for product in products {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO products
                    (id, organization_id, sku, name, category, data, cached_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(product.id.to_string())
            .bind(product.organization_id.to_string())
            .bind(&product.sku)
            .bind(&product.name)
            .bind(product.category.as_deref())
            .bind(serde_json::to_string(product)?)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn cached_products(&self, organization_id: Uuid) -> Result<Vec<Product>, AppError> {
        let rows = sqlx::query_as::<_, CachedDocumentRow>(
            "SELECT id, data FROM products WHERE organization_id = ?1 ORDER BY name ASC",
        )
        .bind(organization_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(document_from_row).collect()
    }

    async fn cache_customers(&self, customers: &[Customer]) -> Result<(), AppError> {
        let now = Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await?;
        for customer in customers {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO customers (id, organization_id, name, data, cached_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(customer.id.to_string())
            .bind(customer.organization_id.to_string())
            .bind(&customer.name)
            .bind(serde_json::to_string(customer)?)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn cached_customers(&self, organization_id: Uuid) -> Result<Vec<Customer>, AppError> {
        let rows = sqlx::query_as::<_, CachedDocumentRow>(
            "SELECT id, data FROM customers WHERE organization_id = ?1 ORDER BY name ASC",
        )
        .bind(organization_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(document_from_row).collect()
    }

    async fn cache_inventory_items(&self, items: &[InventoryItem]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        for item in items {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO inventory_items
                    (id, organization_id, product_id, store_id, quantity_milli, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(item.id.to_string())
            .bind(item.organization_id.to_string())
            .bind(item.product_id.to_string())
            .bind(item.store_id.to_string())
            .bind(item.quantity.milli_units())
            .bind(item.created_at.timestamp_millis())
            .bind(item.updated_at.timestamp_millis())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn cached_inventory(
        &self,
        organization_id: Uuid,
        store_id: Option<Uuid>,
    ) -> Result<Vec<InventoryItem>, AppError> {
        let rows = sqlx::query_as::<_, InventoryItemRow>(
            r#"
            SELECT id, organization_id, product_id, store_id, quantity_milli, created_at, updated_at
            FROM inventory_items
            WHERE organization_id = ?1 AND (?2 IS NULL OR store_id = ?2)
            ORDER BY store_id, product_id
            "#,
        )
        .bind(organization_id.to_string())
        .bind(store_id.map(|id| id.to_string()))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(inventory_item_from_row).collect()
    }

    async fn cached_sales(&self, organization_id: Uuid) -> Result<Vec<Sale>, AppError> {
        let rows = sqlx::query_as::<_, CachedDocumentRow>(
            "SELECT id, data FROM sales WHERE organization_id = ?1 ORDER BY created_at DESC",
        )
        .bind(organization_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(document_from_row).collect()
    }

    async fn cached_sale_items(&self, sale_id: Uuid) -> Result<Vec<SaleItem>, AppError> {
        let rows = sqlx::query_as::<_, CachedDocumentRow>(
            "SELECT id, data FROM sale_items WHERE sale_id = ?1 ORDER BY rowid ASC",
        )
        .bind(sale_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(document_from_row).collect()
    }
}

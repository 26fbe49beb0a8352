use crate::application::ports::remote_store::{
    Filter, RemoteProcedure, RemoteStore, RemoteTable, SelectQuery, from_row, to_row,
};
use crate::domain::entities::{
    Credit, CreditPayment, InventoryAdjustment, SalePayload, SyncOperation,
};
use crate::shared::error::AppError;
use std::sync::Arc;
use uuid::Uuid;

/// Applies one complete operation to the remote store. Used for queue replay and for the
/// online path, so both write exactly the same rows.
///
/// Rows carry client-generated ids and are upserted on `id`, which makes re-running an
/// operation after a partial failure safe for the row writes. The stock procedures are
/// not keyed and may apply twice in that case.
pub struct RemoteApplier {
    remote: Arc<dyn RemoteStore>,
}

impl RemoteApplier {
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self { remote }
    }

    pub async fn apply(&self, operation: &SyncOperation) -> Result<(), AppError> {
        match operation {
            SyncOperation::Sale(payload) => self.apply_sale(payload).await,
            SyncOperation::Inventory(adjustment) => {
                self.apply_inventory_adjustment(adjustment).await
            }
            SyncOperation::Payment(payment) => self.apply_payment(payment).await,
        }
    }

    pub async fn apply_sale(&self, payload: &SalePayload) -> Result<(), AppError> {
        let sale = &payload.sale;

        let stored = self
            .remote
            .upsert(RemoteTable::Sales, vec![to_row(sale)?], "id")
            .await?;
        let sale_id = stored
            .first()
            .and_then(|row| row.get("id"))
            .and_then(|value| value.as_str())
            .and_then(|value| Uuid::parse_str(value).ok())
            .unwrap_or(sale.id);

        if !payload.items.is_empty() {
            let mut rows = Vec::with_capacity(payload.items.len());
            for item in &payload.items {
                let mut row = to_row(item)?;
                row.insert("saleId".to_string(), sale_id.to_string().into());
                rows.push(row);
            }
            self.remote
                .upsert(RemoteTable::SaleItems, rows, "id")
                .await?;
        }

        for item in &payload.items {
            let procedure = RemoteProcedure::DecrementInventory {
                product_id: item.product_id,
                store_id: sale.store_id,
                quantity: item.quantity,
            };
            if let Err(err) = self.remote.rpc(procedure).await {
                tracing::warn!(
                    target: "sync::engine",
                    sale_id = %sale_id,
                    product_id = %item.product_id,
                    error = %err,
                    "inventory decrement failed; keeping the sale"
                );
            }
        }

        if let Some((customer_id, amount)) = sale.credit_due() {
            self.remote
                .rpc(RemoteProcedure::ApplyCreditGiven {
                    transaction_id: payload.credit_transaction_id,
                    customer_id,
                    amount,
                    user_id: sale.user_id,
                    organization_id: sale.organization_id,
                })
                .await?;
            tracing::debug!(
                target: "sync::engine",
                sale_id = %sale_id,
                customer_id = %customer_id,
                amount = %amount,
                "credit given"
            );
        }

        Ok(())
    }

    /// Audit row first; the stock delta is only applied once the audit row is stored.
    pub async fn apply_inventory_adjustment(
        &self,
        adjustment: &InventoryAdjustment,
    ) -> Result<(), AppError> {
        self.remote
            .upsert(
                RemoteTable::InventoryAdjustments,
                vec![to_row(adjustment)?],
                "id",
            )
            .await?;
        self.remote
            .rpc(RemoteProcedure::UpdateInventoryQuantity {
                product_id: adjustment.product_id,
                store_id: adjustment.store_id,
                quantity_delta: adjustment.delta_decimal(),
            })
            .await?;
        Ok(())
    }

    pub async fn apply_payment(&self, payment: &CreditPayment) -> Result<(), AppError> {
        payment.validate().map_err(AppError::ValidationError)?;
        let credit_id = match payment.credit_id {
            Some(credit_id) => credit_id,
            None => self.resolve_credit_id(payment).await?,
        };

        self.remote
            .rpc(RemoteProcedure::ApplyPaymentReceived {
                transaction_id: payment.id,
                credit_id,
                amount: payment.amount,
                note: payment.note.clone(),
                user_id: payment.user_id,
                organization_id: payment.organization_id,
            })
            .await?;
        tracing::debug!(
            target: "sync::engine",
            payment_id = %payment.id,
            credit_id = %credit_id,
            amount = %payment.amount,
            "payment received"
        );
        Ok(())
    }

    /// Credit account of the payment's customer within its organization.
    pub async fn find_credit(
        &self,
        customer_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Credit>, AppError> {
        let rows = self
            .remote
            .select(
                SelectQuery::from(RemoteTable::Credits)
                    .filter(Filter::eq("customerId", customer_id.to_string()))
                    .filter(Filter::eq("organizationId", organization_id.to_string()))
                    .limit(1),
            )
            .await?;
        rows.into_iter().next().map(from_row::<Credit>).transpose()
    }

    async fn resolve_credit_id(&self, payment: &CreditPayment) -> Result<Uuid, AppError> {
        let customer_id = payment.customer_id.ok_or_else(|| {
            AppError::ValidationError("Payment has neither credit nor customer".to_string())
        })?;
        self.find_credit(customer_id, payment.organization_id)
            .await?
            .map(|credit| credit.id)
            .ok_or_else(|| {
                AppError::NotFound(format!("No credit account for customer {customer_id}"))
            })
    }
}

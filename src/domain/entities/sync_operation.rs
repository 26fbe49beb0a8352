use super::credit::CreditPayment;
use super::inventory::InventoryAdjustment;
use super::sale::SalePayload;
use crate::domain::value_objects::{SyncOperationKind, SyncPayload};
use crate::shared::error::AppError;
use uuid::Uuid;

/// Typed view of a queue payload.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOperation {
    Sale(SalePayload),
    Inventory(InventoryAdjustment),
    Payment(CreditPayment),
}

impl SyncOperation {
    pub fn kind(&self) -> SyncOperationKind {
        match self {
            SyncOperation::Sale(_) => SyncOperationKind::Sale,
            SyncOperation::Inventory(_) => SyncOperationKind::Inventory,
            SyncOperation::Payment(_) => SyncOperationKind::Payment,
        }
    }

    pub fn organization_id(&self) -> Uuid {
        match self {
            SyncOperation::Sale(payload) => payload.sale.organization_id,
            SyncOperation::Inventory(adjustment) => adjustment.organization_id,
            SyncOperation::Payment(payment) => payment.organization_id,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.organization_id().is_nil() {
            return Err(AppError::ValidationError(format!(
                "{} operation is missing its organization",
                self.kind()
            )));
        }
        let checked = match self {
            SyncOperation::Sale(payload) => payload.validate(),
            SyncOperation::Inventory(adjustment) if adjustment.quantity.is_zero() => {
                Err("Inventory adjustment quantity must be positive".to_string())
            }
            SyncOperation::Inventory(_) => Ok(()),
            SyncOperation::Payment(payment) => payment.validate(),
        };
        checked.map_err(AppError::ValidationError)
    }

    pub fn to_payload(&self) -> Result<SyncPayload, AppError> {
        let value = match self {
            SyncOperation::Sale(payload) => serde_json::to_value(payload)?,
            SyncOperation::Inventory(adjustment) => serde_json::to_value(adjustment)?,
            SyncOperation::Payment(payment) => serde_json::to_value(payment)?,
        };
        SyncPayload::new(value).map_err(AppError::SerializationError)
    }

    pub fn decode(kind: SyncOperationKind, payload: &SyncPayload) -> Result<Self, AppError> {
        let value = payload.as_json().clone();
        let operation = match kind {
            SyncOperationKind::Sale => SyncOperation::Sale(serde_json::from_value(value)?),
            SyncOperationKind::Inventory => {
                SyncOperation::Inventory(serde_json::from_value(value)?)
            }
            SyncOperationKind::Payment => SyncOperation::Payment(serde_json::from_value(value)?),
        };
        operation.validate()?;
        Ok(operation)
    }
}

use crate::domain::value_objects::Quantity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdjustmentType {
    In,
    Out,
}

/// Audit record of one stock movement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryAdjustment {
    pub id: Uuid,
    pub product_id: Uuid,
    pub store_id: Uuid,
    #[serde(rename = "type")]
    pub adjustment_type: AdjustmentType,
    pub quantity: Quantity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl InventoryAdjustment {
    pub fn signed_milli(&self) -> i64 {
        match self.adjustment_type {
            AdjustmentType::In => self.quantity.milli_units(),
            AdjustmentType::Out => -self.quantity.milli_units(),
        }
    }

    /// Decimal text of the signed delta, as sent to the quantity-update procedure.
    pub fn delta_decimal(&self) -> String {
        match self.adjustment_type {
            AdjustmentType::In => self.quantity.to_string(),
            AdjustmentType::Out => self.quantity.negated_decimal(),
        }
    }
}

/// On-hand quantity of one product at one store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub store_id: Uuid,
    pub quantity: Quantity,
    pub organization_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

use crate::domain::value_objects::{Money, Quantity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentType {
    Cash,
    Credit,
    Mixed,
}

impl PaymentType {
    pub fn defers_payment(&self) -> bool {
        matches!(self, PaymentType::Credit | PaymentType::Mixed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    pub store_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<Uuid>,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub payment_type: PaymentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_amount: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_amount: Option<Money>,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Customer and amount to put on the customer's credit account, if this sale defers any
    /// payment.
    pub fn credit_due(&self) -> Option<(Uuid, Money)> {
        if !self.payment_type.defers_payment() {
            return None;
        }
        let customer_id = self.customer_id?;
        let amount = self.credit_amount.filter(Money::is_positive)?;
        Some((customer_id, amount))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub line_total: Money,
    pub organization_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to replay a checkout: the header, its lines, and the id reserved for the
/// credit-given ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SalePayload {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    pub credit_transaction_id: Uuid,
}

impl SalePayload {
    pub fn validate(&self) -> Result<(), String> {
        for item in &self.items {
            if item.sale_id != self.sale.id {
                return Err(format!(
                    "Sale item {} references sale {} instead of {}",
                    item.id, item.sale_id, self.sale.id
                ));
            }
            if item.organization_id != self.sale.organization_id {
                return Err(format!(
                    "Sale item {} belongs to a different organization",
                    item.id
                ));
            }
        }
        Ok(())
    }
}

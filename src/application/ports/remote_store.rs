use crate::domain::value_objects::{Money, Quantity};
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use thiserror::Error;
use uuid::Uuid;

/// A remote row keyed by camelCase column names. Adapters own the mapping to the wire schema.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("remote returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("could not decode remote response: {0}")]
    Decode(String),
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl RemoteError {
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Network(_) | RemoteError::Timeout => true,
            RemoteError::Status { status, .. } => *status >= 500 || matches!(status, 408 | 429),
            RemoteError::Decode(_) | RemoteError::Rejected(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteTable {
    Sales,
    SaleItems,
    InventoryItems,
    InventoryAdjustments,
    Credits,
    CreditTransactions,
    Customers,
    Products,
}

impl RemoteTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteTable::Sales => "sales",
            RemoteTable::SaleItems => "sale_items",
            RemoteTable::InventoryItems => "inventory_items",
            RemoteTable::InventoryAdjustments => "inventory_adjustments",
            RemoteTable::Credits => "credits",
            RemoteTable::CreditTransactions => "credit_transactions",
            RemoteTable::Customers => "customers",
            RemoteTable::Products => "products",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    IsNull,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    fn new(column: &str, op: FilterOp, value: Value) -> Self {
        Self {
            column: column.to_string(),
            op,
            value,
        }
    }

    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Eq, value.into())
    }

    pub fn neq(column: &str, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Neq, value.into())
    }

    pub fn gt(column: &str, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Gt, value.into())
    }

    pub fn gte(column: &str, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Gte, value.into())
    }

    pub fn lt(column: &str, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Lt, value.into())
    }

    pub fn lte(column: &str, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Lte, value.into())
    }

    pub fn is_null(column: &str) -> Self {
        Self::new(column, FilterOp::IsNull, Value::Null)
    }

    pub fn id(id: Uuid) -> Self {
        Self::eq("id", id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub table: RemoteTable,
    /// Column list, nested fetches included (`*, saleItems(*)`).
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<u32>,
}

impl SelectQuery {
    pub fn from(table: RemoteTable) -> Self {
        Self {
            table,
            columns: "*".to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn columns(mut self, columns: &str) -> Self {
        self.columns = columns.to_string();
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Server-side procedures that execute as a single transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteProcedure {
    DecrementInventory {
        product_id: Uuid,
        store_id: Uuid,
        quantity: Quantity,
    },
    UpdateInventoryQuantity {
        product_id: Uuid,
        store_id: Uuid,
        /// Signed decimal text, e.g. `-2.500`.
        quantity_delta: String,
    },
    /// Checks `amount` against the account's outstanding balance, appends the
    /// `PAYMENT_RECEIVED` transaction `transaction_id` and moves `amount` from outstanding to
    /// paid. Rejects an overpayment without writing anything. A transaction id that already
    /// exists makes the call a no-op.
    ApplyPaymentReceived {
        transaction_id: Uuid,
        credit_id: Uuid,
        amount: Money,
        note: Option<String>,
        user_id: Uuid,
        organization_id: Uuid,
    },
    /// Finds or opens the customer's credit account, adds `amount` to its total and outstanding
    /// balance and appends the `CREDIT_GIVEN` transaction `transaction_id`. A transaction id that
    /// already exists makes the call a no-op.
    ApplyCreditGiven {
        transaction_id: Uuid,
        customer_id: Uuid,
        amount: Money,
        user_id: Uuid,
        organization_id: Uuid,
    },
}

impl RemoteProcedure {
    pub fn name(&self) -> &'static str {
        match self {
            RemoteProcedure::DecrementInventory { .. } => "decrement_inventory",
            RemoteProcedure::UpdateInventoryQuantity { .. } => "update_inventory_quantity",
            RemoteProcedure::ApplyPaymentReceived { .. } => "apply_payment_received",
            RemoteProcedure::ApplyCreditGiven { .. } => "apply_credit_given",
        }
    }

    /// Wire-level arguments; procedure parameters are already snake_case.
    pub fn params(&self) -> Value {
        match self {
            RemoteProcedure::DecrementInventory {
                product_id,
                store_id,
                quantity,
            } => json!({
                "p_product_id": product_id,
                "p_store_id": store_id,
                "p_quantity": quantity,
            }),
            RemoteProcedure::UpdateInventoryQuantity {
                product_id,
                store_id,
                quantity_delta,
            } => json!({
                "p_product_id": product_id,
                "p_store_id": store_id,
                "p_quantity_delta": quantity_delta,
            }),
            RemoteProcedure::ApplyPaymentReceived {
                transaction_id,
                credit_id,
                amount,
                note,
                user_id,
                organization_id,
            } => json!({
                "p_transaction_id": transaction_id,
                "p_credit_id": credit_id,
                "p_amount": amount,
                "p_note": note,
                "p_user_id": user_id,
                "p_organization_id": organization_id,
            }),
            RemoteProcedure::ApplyCreditGiven {
                transaction_id,
                customer_id,
                amount,
                user_id,
                organization_id,
            } => json!({
                "p_transaction_id": transaction_id,
                "p_customer_id": customer_id,
                "p_amount": amount,
                "p_user_id": user_id,
                "p_organization_id": organization_id,
            }),
        }
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn insert(&self, table: RemoteTable, rows: Vec<Row>) -> Result<Vec<Row>, RemoteError>;
    /// Insert-or-merge keyed by `on_conflict`.
    async fn upsert(
        &self,
        table: RemoteTable,
        rows: Vec<Row>,
        on_conflict: &str,
    ) -> Result<Vec<Row>, RemoteError>;
    async fn update(
        &self,
        table: RemoteTable,
        matches: Vec<Filter>,
        patch: Row,
    ) -> Result<Vec<Row>, RemoteError>;
    async fn select(&self, query: SelectQuery) -> Result<Vec<Row>, RemoteError>;
    async fn delete(&self, table: RemoteTable, matches: Vec<Filter>)
    -> Result<Vec<Row>, RemoteError>;
    async fn rpc(&self, procedure: RemoteProcedure) -> Result<Value, RemoteError>;
}

pub fn to_row<T: Serialize>(value: &T) -> Result<Row, AppError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(AppError::SerializationError(format!(
            "expected a JSON object row, got {other}"
        ))),
    }
}

pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, AppError> {
    serde_json::from_value(Value::Object(row))
        .map_err(|err| AppError::DeserializationError(err.to_string()))
}

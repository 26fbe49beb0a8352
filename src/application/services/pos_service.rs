use crate::application::ports::connectivity::ConnectivityService;
use crate::application::ports::session::SessionProvider;
use crate::application::services::remote_applier::RemoteApplier;
use crate::application::services::sync_queue_writer::SyncQueueWriter;
use crate::domain::entities::{
    AdjustmentType, AuthSession, Credit, CreditPayment, InventoryAdjustment, PaymentType, Sale,
    SaleItem, SalePayload, SyncOperation,
};
use crate::domain::value_objects::{Money, Quantity, SyncQueueId};
use crate::shared::error::AppError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLine {
    pub product_id: Uuid,
    pub quantity: Quantity,
    pub unit_price: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub store_id: Uuid,
    #[serde(default)]
    pub customer_id: Option<Uuid>,
    pub lines: Vec<CheckoutLine>,
    #[serde(default)]
    pub discount: Money,
    pub payment_type: PaymentType,
    #[serde(default)]
    pub cash_amount: Option<Money>,
    #[serde(default)]
    pub credit_amount: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryAdjustmentRequest {
    pub product_id: Uuid,
    pub store_id: Uuid,
    pub adjustment_type: AdjustmentType,
    pub quantity: Quantity,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditPaymentRequest {
    #[serde(default)]
    pub credit_id: Option<Uuid>,
    #[serde(default)]
    pub customer_id: Option<Uuid>,
    pub amount: Money,
    #[serde(default)]
    pub note: Option<String>,
}

/// Where a transaction went: straight to the remote store, or into the sync queue.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission<T> {
    Applied(T),
    Queued { record: T, entry_id: SyncQueueId },
}

impl<T> Submission<T> {
    pub fn record(&self) -> &T {
        match self {
            Submission::Applied(record) | Submission::Queued { record, .. } => record,
        }
    }

    pub fn into_record(self) -> T {
        match self {
            Submission::Applied(record) | Submission::Queued { record, .. } => record,
        }
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, Submission::Queued { .. })
    }
}

/// Transaction-producing flows of the till. Each flow builds a complete record stamped with
/// the session's identity, then either applies it remotely or queues it. Never both.
pub struct PosService {
    applier: Arc<RemoteApplier>,
    writer: Arc<SyncQueueWriter>,
    connectivity: Arc<dyn ConnectivityService>,
    session: Arc<dyn SessionProvider>,
}

impl PosService {
    pub fn new(
        applier: Arc<RemoteApplier>,
        writer: Arc<SyncQueueWriter>,
        connectivity: Arc<dyn ConnectivityService>,
        session: Arc<dyn SessionProvider>,
    ) -> Self {
        Self {
            applier,
            writer,
            connectivity,
            session,
        }
    }

    pub async fn checkout(
        &self,
        request: CheckoutRequest,
    ) -> Result<Submission<SalePayload>, AppError> {
        let session = self.require_session()?;
        let payload = build_sale(&request, &session)?;
        self.submit(SyncOperation::Sale(payload), |operation| match operation {
            SyncOperation::Sale(payload) => Some(payload),
            _ => None,
        })
        .await
    }

    pub async fn adjust_inventory(
        &self,
        request: InventoryAdjustmentRequest,
    ) -> Result<Submission<InventoryAdjustment>, AppError> {
        let session = self.require_session()?;
        if request.quantity.is_zero() {
            return Err(AppError::ValidationError(
                "Adjustment quantity must be positive".to_string(),
            ));
        }
        let adjustment = InventoryAdjustment {
            id: Uuid::new_v4(),
            product_id: request.product_id,
            store_id: request.store_id,
            adjustment_type: request.adjustment_type,
            quantity: request.quantity,
            reason: request.reason,
            user_id: session.user_id,
            organization_id: session.organization_id,
            created_at: Utc::now(),
        };
        self.submit(SyncOperation::Inventory(adjustment), |operation| {
            match operation {
                SyncOperation::Inventory(adjustment) => Some(adjustment),
                _ => None,
            }
        })
        .await
    }

    pub async fn receive_payment(
        &self,
        request: CreditPaymentRequest,
    ) -> Result<Submission<CreditPayment>, AppError> {
        let session = self.require_session()?;
        let payment = CreditPayment {
            id: Uuid::new_v4(),
            credit_id: request.credit_id,
            customer_id: request.customer_id,
            amount: request.amount,
            note: request.note,
            user_id: session.user_id,
            organization_id: session.organization_id,
            created_at: Utc::now(),
        };
        payment.validate().map_err(AppError::ValidationError)?;
        self.submit(SyncOperation::Payment(payment), |operation| match operation {
            SyncOperation::Payment(payment) => Some(payment),
            _ => None,
        })
        .await
    }

    /// Current balance of a customer's credit account. Requires connectivity.
    pub async fn credit_for_customer(&self, customer_id: Uuid) -> Result<Option<Credit>, AppError> {
        let session = self.require_session()?;
        self.applier
            .find_credit(customer_id, session.organization_id)
            .await
    }

    async fn submit<T>(
        &self,
        operation: SyncOperation,
        unwrap_record: impl FnOnce(SyncOperation) -> Option<T>,
    ) -> Result<Submission<T>, AppError> {
        operation.validate()?;
        let kind = operation.kind();

        if self.connectivity.current() {
            self.applier.apply(&operation).await.inspect_err(|err| {
                tracing::warn!(
                    target: "pos",
                    kind = %kind,
                    error = %err,
                    "online submission failed"
                );
            })?;
            tracing::info!(target: "pos", kind = %kind, "applied online");
            let record = unwrap_record(operation).ok_or_else(mismatched_record)?;
            return Ok(Submission::Applied(record));
        }

        let entry = self.writer.enqueue_operation(&operation).await?;
        tracing::info!(
            target: "pos",
            kind = %kind,
            entry_id = %entry.id,
            "offline; queued for sync"
        );
        let record = unwrap_record(operation).ok_or_else(mismatched_record)?;
        Ok(Submission::Queued {
            record,
            entry_id: entry.id,
        })
    }

    fn require_session(&self) -> Result<AuthSession, AppError> {
        self.session
            .current()
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))
    }
}

fn mismatched_record() -> AppError {
    AppError::Internal("operation kind changed during submission".to_string())
}

fn build_sale(request: &CheckoutRequest, session: &AuthSession) -> Result<SalePayload, AppError> {
    if request.lines.is_empty() {
        return Err(AppError::ValidationError(
            "A sale needs at least one line".to_string(),
        ));
    }

    let sale_id = Uuid::new_v4();
    let created_at = Utc::now();
    let mut subtotal = Money::ZERO;
    let mut items = Vec::with_capacity(request.lines.len());
    for line in &request.lines {
        if line.quantity.is_zero() {
            return Err(AppError::ValidationError(format!(
                "Line for product {} has no quantity",
                line.product_id
            )));
        }
        let line_total = line
            .unit_price
            .times(line.quantity)
            .ok_or_else(|| AppError::ValidationError("Line total out of range".to_string()))?;
        subtotal = subtotal
            .checked_add(line_total)
            .ok_or_else(|| AppError::ValidationError("Subtotal out of range".to_string()))?;
        items.push(SaleItem {
            id: Uuid::new_v4(),
            sale_id,
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_total,
            organization_id: session.organization_id,
            created_at,
        });
    }

    let total = subtotal.checked_sub(request.discount).ok_or_else(|| {
        AppError::ValidationError(format!(
            "Discount {} exceeds subtotal {subtotal}",
            request.discount
        ))
    })?;
    let (cash_amount, credit_amount) = split_payment(request, total)?;

    if credit_amount.is_some_and(|amount| amount.is_positive()) && request.customer_id.is_none()
    {
        return Err(AppError::ValidationError(
            "Credit sales need a customer".to_string(),
        ));
    }

    Ok(SalePayload {
        sale: Sale {
            id: sale_id,
            store_id: request.store_id,
            customer_id: request.customer_id,
            subtotal,
            discount: request.discount,
            total,
            payment_type: request.payment_type,
            cash_amount,
            credit_amount,
            user_id: session.user_id,
            organization_id: session.organization_id,
            created_at,
        },
        items,
        credit_transaction_id: Uuid::new_v4(),
    })
}

fn split_payment(
    request: &CheckoutRequest,
    total: Money,
) -> Result<(Option<Money>, Option<Money>), AppError> {
    match request.payment_type {
        PaymentType::Cash => {
            if request.credit_amount.is_some_and(|amount| !amount.is_zero()) {
                return Err(AppError::ValidationError(
                    "Cash sales cannot carry a credit amount".to_string(),
                ));
            }
            Ok((Some(request.cash_amount.unwrap_or(total)), None))
        }
        PaymentType::Credit => {
            let credit = request.credit_amount.unwrap_or(total);
            if credit != total {
                return Err(AppError::ValidationError(format!(
                    "Credit amount {credit} must equal total {total}"
                )));
            }
            if request.cash_amount.is_some_and(|amount| !amount.is_zero()) {
                return Err(AppError::ValidationError(
                    "Credit sales cannot carry a cash amount".to_string(),
                ));
            }
            Ok((None, Some(credit)))
        }
        PaymentType::Mixed => {
            let (Some(cash), Some(credit)) = (request.cash_amount, request.credit_amount) else {
                return Err(AppError::ValidationError(
                    "Mixed payments need both cash and credit amounts".to_string(),
                ));
            };
            if cash.checked_add(credit) != Some(total) {
                return Err(AppError::ValidationError(format!(
                    "Cash {cash} plus credit {credit} must equal total {total}"
                )));
            }
            Ok((Some(cash), Some(credit)))
        }
    }
}

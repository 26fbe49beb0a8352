use crate::domain::value_objects::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("ledger amount must be positive")]
    ZeroAmount,
    #[error("payment {amount} exceeds outstanding balance {outstanding}")]
    Overpayment { outstanding: Money, amount: Money },
    #[error("ledger balance overflow")]
    Overflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditTransactionType {
    CreditGiven,
    PaymentReceived,
}

/// Per-customer running balance. A cache of the customer's ledger transactions:
/// `outstanding_amount == total_amount - paid_amount` at all times.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Credit {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub total_amount: Money,
    pub paid_amount: Money,
    pub outstanding_amount: Money,
    pub organization_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Credit {
    pub fn open(
        id: Uuid,
        customer_id: Uuid,
        organization_id: Uuid,
        amount: Money,
        now: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::ZeroAmount);
        }
        Ok(Self {
            id,
            customer_id,
            total_amount: amount,
            paid_amount: Money::ZERO,
            outstanding_amount: amount,
            organization_id,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn give_credit(&mut self, amount: Money, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::ZeroAmount);
        }
        let total = self
            .total_amount
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let outstanding = self
            .outstanding_amount
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.total_amount = total;
        self.outstanding_amount = outstanding;
        self.updated_at = now;
        Ok(())
    }

    pub fn receive_payment(&mut self, amount: Money, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::ZeroAmount);
        }
        let outstanding =
            self.outstanding_amount
                .checked_sub(amount)
                .ok_or(LedgerError::Overpayment {
                    outstanding: self.outstanding_amount,
                    amount,
                })?;
        let paid = self
            .paid_amount
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.outstanding_amount = outstanding;
        self.paid_amount = paid;
        self.updated_at = now;
        Ok(())
    }

    pub fn is_balanced(&self) -> bool {
        self.total_amount.checked_sub(self.paid_amount) == Some(self.outstanding_amount)
    }
}

/// Immutable ledger event justifying one balance change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreditTransaction {
    pub id: Uuid,
    pub credit_id: Uuid,
    #[serde(rename = "type")]
    pub transaction_type: CreditTransactionType,
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A payment collected against a customer's credit account. The account may only be known by
/// customer when the payment is taken offline right after a credit sale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreditPayment {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<Uuid>,
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl CreditPayment {
    pub fn validate(&self) -> Result<(), String> {
        if self.credit_id.is_none() && self.customer_id.is_none() {
            return Err("Payment must reference a credit account or a customer".to_string());
        }
        if !self.amount.is_positive() {
            return Err("Payment amount must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(major: i64) -> Money {
        Money::from_major(major).unwrap()
    }

    #[test]
    fn ledger_arithmetic_keeps_balance() {
        let now = Utc::now();
        let mut credit =
            Credit::open(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), money(500), now).unwrap();
        assert_eq!(credit.paid_amount, Money::ZERO);
        assert_eq!(credit.outstanding_amount, money(500));

        credit.give_credit(money(300), now).unwrap();
        assert_eq!(credit.total_amount, money(800));
        assert_eq!(credit.outstanding_amount, money(800));

        credit.receive_payment(money(200), now).unwrap();
        assert_eq!(credit.outstanding_amount, money(600));
        assert_eq!(credit.paid_amount, money(200));
        assert!(credit.is_balanced());
    }

    #[test]
    fn overpayment_is_rejected_without_mutation() {
        let now = Utc::now();
        let mut credit =
            Credit::open(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), money(100), now).unwrap();
        let err = credit.receive_payment(money(150), now).unwrap_err();
        assert_eq!(
            err,
            LedgerError::Overpayment {
                outstanding: money(100),
                amount: money(150)
            }
        );
        assert_eq!(credit.outstanding_amount, money(100));
        assert_eq!(credit.paid_amount, Money::ZERO);
    }

    #[test]
    fn transaction_type_wire_names() {
        assert_eq!(
            serde_json::to_value(CreditTransactionType::CreditGiven).unwrap(),
            "CREDIT_GIVEN"
        );
        assert_eq!(
            serde_json::to_value(CreditTransactionType::PaymentReceived).unwrap(),
            "PAYMENT_RECEIVED"
        );
    }

    #[test]
    fn payment_needs_an_account_reference() {
        let payment = CreditPayment {
            id: Uuid::new_v4(),
            credit_id: None,
            customer_id: None,
            amount: money(10),
            note: None,
            user_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            created_at: Utc::now(),
        };
        assert!(payment.validate().is_err());
    }
}

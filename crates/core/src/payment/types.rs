//! Payment transactions and their status machine.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sarraf_shared::config::PaymentConfig;
use sarraf_shared::types::{
    BranchId, CurrencyCode, Money, PaymentId, TenantId, TransactionId, UserId,
};

use super::error::PaymentError;
use crate::cash::PaymentMethod;

/// Collection state of a transaction.
///
/// `Single` is fixed for transactions without partial payments; the others
/// are derived from the active payments every time they change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Paid in one go; partial payments disabled.
    Single,
    /// Nothing paid yet.
    Open,
    /// Some paid, more than the tolerance band left.
    Partial,
    /// Remaining balance inside the tolerance band.
    FullyPaid,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Single => "SINGLE",
            Self::Open => "OPEN",
            Self::Partial => "PARTIAL",
            Self::FullyPaid => "FULLY_PAID",
        })
    }
}

/// Rounding slack when deciding a transaction is fully paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentTolerance {
    /// Share of the total received.
    pub ratio: Decimal,
    /// Absolute minimum.
    pub floor: Decimal,
}

impl Default for PaymentTolerance {
    fn default() -> Self {
        Self::from(&PaymentConfig::default())
    }
}

impl From<&PaymentConfig> for PaymentTolerance {
    fn from(config: &PaymentConfig) -> Self {
        Self {
            ratio: config.fully_paid_tolerance_ratio,
            floor: config.fully_paid_tolerance_floor,
        }
    }
}

impl PaymentTolerance {
    /// `max(ratio * total, floor)`.
    #[must_use]
    pub fn band(&self, total: Decimal) -> Decimal {
        (self.ratio * total).max(self.floor)
    }
}

/// Input for a new transaction.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    /// Tenant.
    pub tenant_id: TenantId,
    /// Branch where the money is paid out.
    pub branch_id: Option<BranchId>,
    /// Amount owed, in the base currency.
    pub total_received: Money,
    /// Whether the customer may be paid in installments.
    pub allow_partial_payment: bool,
    /// Operator.
    pub actor: UserId,
}

/// A transaction whose total is paid out by one or more payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    /// Transaction ID.
    pub id: TransactionId,
    /// Tenant.
    pub tenant_id: TenantId,
    /// Branch.
    pub branch_id: Option<BranchId>,
    /// Currency of the totals.
    pub base_currency: CurrencyCode,
    /// Total owed.
    pub total_received: Money,
    /// Sum of active payments, converted.
    pub total_paid: Money,
    /// `total_received - total_paid`.
    pub remaining_balance: Money,
    /// Installments allowed.
    pub allow_partial_payment: bool,
    /// Collection state.
    pub status: PaymentStatus,
    /// Operator.
    pub created_by: UserId,
    /// Created.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl PaymentTransaction {
    /// Opens a transaction with nothing paid.
    ///
    /// # Errors
    ///
    /// `NonPositiveTotal` unless the total is positive.
    pub fn new(input: NewTransaction, now: DateTime<Utc>) -> Result<Self, PaymentError> {
        if !input.total_received.is_positive() {
            return Err(PaymentError::NonPositiveTotal(input.total_received));
        }
        let currency = input.total_received.currency;
        Ok(Self {
            id: TransactionId::new(),
            tenant_id: input.tenant_id,
            branch_id: input.branch_id,
            base_currency: currency,
            total_received: input.total_received,
            total_paid: Money::zero(currency),
            remaining_balance: input.total_received,
            allow_partial_payment: input.allow_partial_payment,
            status: if input.allow_partial_payment {
                PaymentStatus::Open
            } else {
                PaymentStatus::Single
            },
            created_by: input.actor,
            created_at: now,
            updated_at: now,
        })
    }

    /// Checks that a new payment of `converted` fits the transaction.
    ///
    /// # Errors
    ///
    /// * `NonPositiveAmount` unless the amount is positive
    /// * `ExceedsRemaining` when an installment overshoots the band or the
    ///   transaction is already fully paid
    /// * `OverpaymentRejected` when a single payment is not the full balance
    ///   or one was already recorded
    pub fn admit(&self, converted: Money, tolerance: &PaymentTolerance) -> Result<(), PaymentError> {
        self.remaining_balance.ensure_same_currency(&converted)?;
        if !converted.is_positive() {
            return Err(PaymentError::NonPositiveAmount(converted));
        }
        if self.is_settled() {
            return Err(if self.allow_partial_payment {
                PaymentError::ExceedsRemaining {
                    requested: converted,
                    remaining: self.remaining_balance,
                }
            } else {
                PaymentError::OverpaymentRejected {
                    requested: converted,
                    remaining: self.remaining_balance,
                }
            });
        }
        // The band only absorbs rounding on the payment that closes the balance.
        let band = tolerance.band(self.total_received.amount);
        let remaining = self.remaining_balance.amount;
        if self.allow_partial_payment {
            if converted.amount > remaining + band {
                return Err(PaymentError::ExceedsRemaining {
                    requested: converted,
                    remaining: self.remaining_balance,
                });
            }
        } else if (converted.amount - remaining).abs() > band {
            return Err(PaymentError::OverpaymentRejected {
                requested: converted,
                remaining: self.remaining_balance,
            });
        }
        Ok(())
    }

    /// True once nothing more may be paid: a single payment is on record,
    /// the installments reached FULLY_PAID, or the balance is used up.
    pub fn is_settled(&self) -> bool {
        if self.allow_partial_payment {
            self.status == PaymentStatus::FullyPaid || !self.remaining_balance.is_positive()
        } else {
            !self.total_paid.is_zero()
        }
    }

    /// Returns the transaction with totals and status rebuilt from `payments`.
    ///
    /// Cancelled payments are skipped; nothing is carried over from the
    /// previous totals.
    ///
    /// # Errors
    ///
    /// `CurrencyMismatch` if a payment was converted into another currency.
    pub fn recompute(
        &self,
        payments: &[Payment],
        tolerance: &PaymentTolerance,
        now: DateTime<Utc>,
    ) -> Result<Self, PaymentError> {
        let total_paid = payments
            .iter()
            .filter(|p| p.is_active())
            .try_fold(Money::zero(self.base_currency), |acc, p| {
                acc.checked_add(p.converted_amount)
            })?;
        let remaining = self.total_received.checked_sub(total_paid)?;

        let status = if !self.allow_partial_payment {
            PaymentStatus::Single
        } else if total_paid.is_zero() {
            PaymentStatus::Open
        } else if remaining.amount <= tolerance.band(self.total_received.amount) {
            PaymentStatus::FullyPaid
        } else {
            PaymentStatus::Partial
        };

        Ok(Self {
            total_paid,
            remaining_balance: remaining,
            status,
            updated_at: now,
            ..self.clone()
        })
    }
}

/// Whether a payment still counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PaymentState {
    /// Counts toward the transaction.
    Active,
    /// Kept for audit, ignored by totals.
    Cancelled {
        /// Why.
        reason: String,
        /// Operator.
        cancelled_by: UserId,
        /// When.
        cancelled_at: DateTime<Utc>,
    },
}

/// Input for a payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    /// Tenant.
    pub tenant_id: TenantId,
    /// Transaction being paid.
    pub transaction_id: TransactionId,
    /// Amount in the currency handed over.
    pub amount: Money,
    /// Units of base currency per unit of `amount`.
    pub exchange_rate: Decimal,
    /// How it was paid.
    pub method: PaymentMethod,
    /// Operator.
    pub actor: UserId,
}

/// One installment against a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Payment ID.
    pub id: PaymentId,
    /// Tenant.
    pub tenant_id: TenantId,
    /// Transaction.
    pub transaction_id: TransactionId,
    /// Amount handed over.
    pub amount: Money,
    /// Rate used.
    pub exchange_rate: Decimal,
    /// Amount in the transaction's base currency.
    pub converted_amount: Money,
    /// How it was paid.
    pub method: PaymentMethod,
    /// Active or cancelled.
    pub state: PaymentState,
    /// Operator.
    pub recorded_by: UserId,
    /// Recorded.
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Converts the input into the base currency.
    ///
    /// # Errors
    ///
    /// `InvalidRate` for a non-positive rate, or a same-currency payment at a
    /// rate other than one.
    pub fn new(input: NewPayment, base_currency: CurrencyCode, now: DateTime<Utc>) -> Result<Self, PaymentError> {
        if input.amount.currency == base_currency && input.exchange_rate != Decimal::ONE {
            return Err(PaymentError::InvalidRate(input.exchange_rate));
        }
        let converted = input
            .amount
            .convert(input.exchange_rate, base_currency)
            .map_err(|_| PaymentError::InvalidRate(input.exchange_rate))?;
        Ok(Self {
            id: PaymentId::new(),
            tenant_id: input.tenant_id,
            transaction_id: input.transaction_id,
            amount: input.amount,
            exchange_rate: input.exchange_rate,
            converted_amount: converted,
            method: input.method,
            state: PaymentState::Active,
            recorded_by: input.actor,
            created_at: now,
        })
    }

    /// Returns true unless cancelled.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self.state, PaymentState::Active)
    }

    /// Returns the payment marked cancelled.
    ///
    /// # Errors
    ///
    /// `AlreadyCancelled` if it was cancelled before.
    pub fn cancel(&self, reason: &str, actor: UserId, now: DateTime<Utc>) -> Result<Self, PaymentError> {
        if !self.is_active() {
            return Err(PaymentError::AlreadyCancelled(self.id));
        }
        Ok(Self {
            state: PaymentState::Cancelled {
                reason: reason.to_string(),
                cancelled_by: actor,
                cancelled_at: now,
            },
            ..self.clone()
        })
    }
}

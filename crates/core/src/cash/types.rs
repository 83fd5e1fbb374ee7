//! Branch cash domain types.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sarraf_shared::types::{
    BranchId, CashAdjustmentId, CashMovementId, CurrencyCode, Money, PaymentId, ReconciliationId,
    TenantId, TransactionId, UserId,
};

/// How money changed hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Physical cash at the counter; the only method that moves the till.
    Cash,
    /// Bank wire or e-transfer.
    BankTransfer,
    /// Debit or credit card.
    Card,
    /// Cheque or bank draft.
    Cheque,
}

/// A (tenant, branch, currency) cash bucket. `branch_id = None` is head office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CashScope {
    /// Tenant.
    pub tenant_id: TenantId,
    /// Branch, if any.
    pub branch_id: Option<BranchId>,
    /// Currency.
    pub currency: CurrencyCode,
}

impl CashScope {
    /// Builds a scope.
    #[must_use]
    pub const fn new(tenant_id: TenantId, branch_id: Option<BranchId>, currency: CurrencyCode) -> Self {
        Self {
            tenant_id,
            branch_id,
            currency,
        }
    }
}

impl fmt::Display for CashScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.branch_id {
            Some(branch) => write!(f, "{}/{}/{}", self.tenant_id, branch, self.currency),
            None => write!(f, "{}/head-office/{}", self.tenant_id, self.currency),
        }
    }
}

/// One append-only cash leg of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashMovement {
    /// Movement ID.
    pub id: CashMovementId,
    /// Per-tenant append sequence, assigned by the store.
    pub sequence: u64,
    /// Tenant.
    pub tenant_id: TenantId,
    /// Branch.
    pub branch_id: Option<BranchId>,
    /// Signed amount; positive is cash into the till.
    pub amount: Money,
    /// Method; only `Cash` counts toward the till balance.
    pub method: PaymentMethod,
    /// Transaction the leg belongs to.
    pub source_transaction_id: Option<TransactionId>,
    /// Payment the leg belongs to.
    pub source_payment_id: Option<PaymentId>,
    /// Free-text note.
    pub note: Option<String>,
    /// When the money moved.
    pub occurred_at: DateTime<Utc>,
}

impl CashMovement {
    /// Scope the movement affects.
    #[must_use]
    pub fn scope(&self) -> CashScope {
        CashScope::new(self.tenant_id, self.branch_id, self.amount.currency)
    }

    /// Returns true if the movement counts toward the till.
    #[must_use]
    pub fn is_cash(&self) -> bool {
        self.method == PaymentMethod::Cash
    }
}

/// Folded prefix of the movement log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashCheckpoint {
    /// Sum of CASH legs up to and including `through_sequence`.
    pub balance: Decimal,
    /// Last folded sequence number.
    pub through_sequence: u64,
}

impl CashCheckpoint {
    /// Folds movements past the checkpoint; returns the new auto balance and
    /// the highest sequence seen.
    ///
    /// Movements at or below `through_sequence` are skipped.
    #[must_use]
    pub fn fold(&self, movements: &[CashMovement]) -> CashCheckpoint {
        movements
            .iter()
            .filter(|m| m.sequence > self.through_sequence)
            .fold(*self, |acc, m| CashCheckpoint {
                balance: if m.is_cash() {
                    acc.balance + m.amount.amount
                } else {
                    acc.balance
                },
                through_sequence: acc.through_sequence.max(m.sequence),
            })
    }
}

/// Cash position of one scope.
///
/// `final_balance = auto_calculated + manual_adjustment` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashBalance {
    /// The bucket.
    pub scope: CashScope,
    /// Derived from CASH transaction legs.
    pub auto_calculated: Money,
    /// Cumulative operator corrections.
    pub manual_adjustment: Money,
    /// What the till should hold.
    pub final_balance: Money,
    /// Reconciled prefix of the movement log.
    pub checkpoint: CashCheckpoint,
    /// When `auto_calculated` was last refreshed.
    pub last_calculated_at: DateTime<Utc>,
}

impl CashBalance {
    /// A zero balance for a scope with no history.
    #[must_use]
    pub fn empty(scope: CashScope, now: DateTime<Utc>) -> Self {
        let zero = Money::zero(scope.currency);
        Self {
            scope,
            auto_calculated: zero,
            manual_adjustment: zero,
            final_balance: zero,
            checkpoint: CashCheckpoint::default(),
            last_calculated_at: now,
        }
    }

    /// Returns the balance with `auto_calculated` refreshed from movements
    /// past the checkpoint. The checkpoint itself does not move.
    #[must_use]
    pub fn refreshed(&self, movements: &[CashMovement], now: DateTime<Utc>) -> Self {
        let folded = self.checkpoint.fold(movements);
        let auto = Money::new(folded.balance, self.scope.currency);
        Self {
            auto_calculated: auto,
            final_balance: Money::new(auto.amount + self.manual_adjustment.amount, self.scope.currency),
            last_calculated_at: now,
            ..self.clone()
        }
    }

    /// Returns the balance with the checkpoint advanced over `movements`.
    #[must_use]
    pub fn checkpointed(&self, movements: &[CashMovement], now: DateTime<Utc>) -> Self {
        let refreshed = self.refreshed(movements, now);
        Self {
            checkpoint: self.checkpoint.fold(movements),
            ..refreshed
        }
    }

    /// Returns the balance with `delta` added to the manual adjustment.
    #[must_use]
    pub fn adjusted(&self, delta: Decimal) -> Self {
        let manual = Money::new(self.manual_adjustment.amount + delta, self.scope.currency);
        Self {
            manual_adjustment: manual,
            final_balance: Money::new(self.auto_calculated.amount + manual.amount, self.scope.currency),
            ..self.clone()
        }
    }
}

/// Audit log row of one manual adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashAdjustment {
    /// Adjustment ID.
    pub id: CashAdjustmentId,
    /// The bucket.
    pub scope: CashScope,
    /// Signed correction.
    pub delta: Money,
    /// Why.
    pub reason: String,
    /// Final balance before.
    pub balance_before: Money,
    /// Final balance after.
    pub balance_after: Money,
    /// Operator.
    pub adjusted_by: UserId,
    /// When.
    pub created_at: DateTime<Utc>,
}

/// Outcome of comparing a count with the expected balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarianceStatus {
    /// Count matches.
    Balanced,
    /// More cash than expected.
    Over,
    /// Less cash than expected.
    Short,
}

impl VarianceStatus {
    /// Classifies `counted - expected`.
    #[must_use]
    pub fn of(variance: Decimal) -> Self {
        if variance.is_zero() {
            Self::Balanced
        } else if variance.is_sign_positive() {
            Self::Over
        } else {
            Self::Short
        }
    }
}

/// Expected vs counted for one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationLine {
    /// Currency.
    pub currency: CurrencyCode,
    /// Opening count.
    pub opening: Money,
    /// System balance at reconciliation time.
    pub expected: Money,
    /// Counted closing cash.
    pub counted: Money,
    /// `counted - expected`.
    pub variance: Money,
    /// Classification of the variance.
    pub status: VarianceStatus,
}

impl ReconciliationLine {
    /// Builds a line from the three figures.
    #[must_use]
    pub fn new(currency: CurrencyCode, opening: Decimal, expected: Decimal, counted: Decimal) -> Self {
        let variance = counted - expected;
        Self {
            currency,
            opening: Money::new(opening, currency),
            expected: Money::new(expected, currency),
            counted: Money::new(counted, currency),
            variance: Money::new(variance, currency),
            status: VarianceStatus::of(variance),
        }
    }
}

/// Immutable end-of-day cash count of one branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyReconciliation {
    /// Record ID.
    pub id: ReconciliationId,
    /// Tenant.
    pub tenant_id: TenantId,
    /// Branch.
    pub branch_id: BranchId,
    /// Business date.
    pub date: NaiveDate,
    /// Line of the primary currency.
    pub primary: ReconciliationLine,
    /// Lines of the other counted currencies.
    pub breakdown: Vec<ReconciliationLine>,
    /// Operator note.
    pub notes: Option<String>,
    /// Operator.
    pub created_by: UserId,
    /// When the count was recorded.
    pub created_at: DateTime<Utc>,
}

/// Counted figures of one currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyCount {
    /// Currency.
    pub currency: CurrencyCode,
    /// Opening count.
    pub opening: Decimal,
    /// Closing count.
    pub counted: Decimal,
}

/// Input for a daily reconciliation.
#[derive(Debug, Clone)]
pub struct NewReconciliation {
    /// Tenant.
    pub tenant_id: TenantId,
    /// Branch.
    pub branch_id: BranchId,
    /// Business date.
    pub date: NaiveDate,
    /// Primary currency count.
    pub primary: CurrencyCount,
    /// Other currency counts.
    pub breakdown: Vec<CurrencyCount>,
    /// Operator note.
    pub notes: Option<String>,
    /// Operator.
    pub actor: UserId,
}

/// Input for a cash movement.
#[derive(Debug, Clone)]
pub struct NewCashMovement {
    /// Tenant.
    pub tenant_id: TenantId,
    /// Branch.
    pub branch_id: Option<BranchId>,
    /// Signed amount.
    pub amount: Money,
    /// Method.
    pub method: PaymentMethod,
    /// Transaction the leg belongs to.
    pub source_transaction_id: Option<TransactionId>,
    /// Payment the leg belongs to.
    pub source_payment_id: Option<PaymentId>,
    /// Free-text note.
    pub note: Option<String>,
}

impl NewCashMovement {
    /// Materializes the movement; the store assigns the sequence.
    #[must_use]
    pub fn into_movement(self, now: DateTime<Utc>) -> CashMovement {
        CashMovement {
            id: CashMovementId::new(),
            sequence: 0,
            tenant_id: self.tenant_id,
            branch_id: self.branch_id,
            amount: self.amount,
            method: self.method,
            source_transaction_id: self.source_transaction_id,
            source_payment_id: self.source_payment_id,
            note: self.note,
            occurred_at: now,
        }
    }
}

//! Remittance records and their settlement-tracking state.
//!
//! Both sides are denominated in rials. Rates are quoted as rials per Canadian
//! dollar, so the CAD equivalent of a remittance is `amount_irr / rate`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sarraf_shared::types::{
    ClientId, CurrencyCode, IncomingRemittanceId, Money, OutgoingRemittanceId, TenantId, UserId,
};

use super::error::RemittanceError;

/// Status of an outgoing (Canada to Iran) remittance.
///
/// Moves only PENDING -> PARTIAL -> COMPLETED, or to CANCELLED from PENDING/PARTIAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutgoingStatus {
    /// Nothing settled yet.
    Pending,
    /// Partly settled.
    Partial,
    /// Fully settled (terminal).
    Completed,
    /// Cancelled (terminal).
    Cancelled,
}

impl OutgoingStatus {
    /// Returns true if the remittance can take part in a settlement.
    #[must_use]
    pub fn accepts_settlement(self) -> bool {
        matches!(self, Self::Pending | Self::Partial)
    }

    /// Returns true if no further transition is possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for OutgoingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Partial => write!(f, "PARTIAL"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Status of an incoming (Iran to Canada) remittance.
///
/// COMPLETED means fully allocated to outgoing debts. PAID is reached only by
/// disbursing the CAD to the recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncomingStatus {
    /// Nothing allocated yet.
    Pending,
    /// Partly allocated.
    Partial,
    /// Fully allocated.
    Completed,
    /// Paid out to the recipient.
    Paid,
    /// Cancelled (terminal).
    Cancelled,
}

impl IncomingStatus {
    /// Returns true if the remittance can still be allocated.
    #[must_use]
    pub fn accepts_allocation(self) -> bool {
        matches!(self, Self::Pending | Self::Partial | Self::Paid)
    }
}

impl std::fmt::Display for IncomingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Partial => write!(f, "PARTIAL"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Paid => write!(f, "PAID"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Input for a new remittance of either direction.
#[derive(Debug, Clone)]
pub struct NewRemittance {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Client who ordered the remittance, if known.
    pub client_id: Option<ClientId>,
    /// Human-readable reference (slip number).
    pub reference: String,
    /// Amount in rials.
    pub amount_irr: Money,
    /// Rials per CAD; looked up from the rate provider when absent.
    pub rate_cad: Option<Decimal>,
    /// Operator creating the record.
    pub created_by: UserId,
}

/// Debt owed by the exchange to deliver rials in Iran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingRemittance {
    /// Remittance ID.
    pub id: OutgoingRemittanceId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Ordering client.
    pub client_id: Option<ClientId>,
    /// Slip reference.
    pub reference: String,
    /// Total obligation in rials.
    pub amount_irr: Money,
    /// Cost-basis rate, rials per CAD.
    pub buy_rate_cad: Decimal,
    /// `amount_irr / buy_rate_cad`, rounded to cents.
    pub equivalent_cad: Money,
    /// Cumulative rials settled.
    pub settled_irr: Money,
    /// `amount_irr - settled_irr`.
    pub remaining_irr: Money,
    /// Lifecycle status.
    pub status: OutgoingStatus,
    /// Operator who created it.
    pub created_by: UserId,
    /// Creation time; FIFO/LIFO order key.
    pub created_at: DateTime<Utc>,
    /// Last state change.
    pub updated_at: DateTime<Utc>,
}

/// Rials received in the Iran corridor, to be paid out as CAD in Canada.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingRemittance {
    /// Remittance ID.
    pub id: IncomingRemittanceId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Recipient client.
    pub client_id: Option<ClientId>,
    /// Slip reference.
    pub reference: String,
    /// Total received in rials.
    pub amount_irr: Money,
    /// Payout rate, rials per CAD.
    pub sell_rate_cad: Decimal,
    /// `amount_irr / sell_rate_cad`, rounded to cents.
    pub equivalent_cad: Money,
    /// Cumulative rials matched to outgoing debts.
    pub allocated_irr: Money,
    /// `amount_irr - allocated_irr`.
    pub remaining_irr: Money,
    /// Lifecycle status.
    pub status: IncomingStatus,
    /// When the CAD was disbursed to the recipient.
    pub paid_at: Option<DateTime<Utc>>,
    /// Operator who created it.
    pub created_by: UserId,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last state change.
    pub updated_at: DateTime<Utc>,
}

/// Validates amount and rate shared by both directions and derives the CAD equivalent.
fn validate_new(amount_irr: Money, rate: Decimal) -> Result<Money, RemittanceError> {
    if amount_irr.currency != CurrencyCode::IRR {
        return Err(RemittanceError::NotRialDenominated(amount_irr.currency));
    }
    if !amount_irr.is_positive() {
        return Err(RemittanceError::NonPositiveAmount(amount_irr));
    }
    if rate <= Decimal::ZERO {
        return Err(RemittanceError::InvalidRate(rate));
    }
    Ok(amount_irr.divide_by_rate(rate, CurrencyCode::CAD)?)
}

/// Validates a settlement amount against the remaining balance.
fn validate_take(amount: Money, remaining: Money) -> Result<Money, RemittanceError> {
    remaining.ensure_same_currency(&amount)?;
    if !amount.is_positive() {
        return Err(RemittanceError::NonPositiveAmount(amount));
    }
    if amount.amount > remaining.amount {
        return Err(RemittanceError::ExceedsRemaining {
            requested: amount,
            remaining,
        });
    }
    Ok(remaining.checked_sub(amount)?)
}

impl OutgoingRemittance {
    /// Creates a PENDING outgoing remittance.
    ///
    /// # Errors
    ///
    /// Fails unless the amount is positive rials and the rate is positive.
    pub fn new(input: NewRemittance, buy_rate_cad: Decimal, now: DateTime<Utc>) -> Result<Self, RemittanceError> {
        let equivalent_cad = validate_new(input.amount_irr, buy_rate_cad)?;
        Ok(Self {
            id: OutgoingRemittanceId::new(),
            tenant_id: input.tenant_id,
            client_id: input.client_id,
            reference: input.reference,
            amount_irr: input.amount_irr,
            buy_rate_cad,
            equivalent_cad,
            settled_irr: Money::zero(CurrencyCode::IRR),
            remaining_irr: input.amount_irr,
            status: OutgoingStatus::Pending,
            created_by: input.created_by,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns true if this debt is a settlement candidate.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status.accepts_settlement() && self.remaining_irr.is_positive()
    }

    /// Returns the remittance after settling `amount` rials against it.
    ///
    /// # Errors
    ///
    /// Fails if the remittance is terminal, or the amount is not positive or
    /// exceeds the remaining balance.
    pub fn apply_settlement(&self, amount: Money, now: DateTime<Utc>) -> Result<Self, RemittanceError> {
        if !self.status.accepts_settlement() {
            return Err(RemittanceError::OutgoingNotSettleable {
                id: self.id,
                status: self.status,
            });
        }
        let remaining_irr = validate_take(amount, self.remaining_irr)?;

        let mut next = self.clone();
        next.settled_irr = self.settled_irr.checked_add(amount)?;
        next.remaining_irr = remaining_irr;
        next.status = if remaining_irr.is_zero() {
            OutgoingStatus::Completed
        } else {
            OutgoingStatus::Partial
        };
        next.updated_at = now;
        Ok(next)
    }

    /// Returns the remittance cancelled.
    ///
    /// Rials already settled stay recorded; only the open remainder is abandoned.
    ///
    /// # Errors
    ///
    /// Fails if the remittance is already COMPLETED or CANCELLED.
    pub fn cancel(&self, now: DateTime<Utc>) -> Result<Self, RemittanceError> {
        if self.status.is_terminal() {
            return Err(RemittanceError::InvalidTransition {
                from: self.status.to_string(),
                to: OutgoingStatus::Cancelled.to_string(),
            });
        }
        let mut next = self.clone();
        next.status = OutgoingStatus::Cancelled;
        next.updated_at = now;
        Ok(next)
    }
}

impl IncomingRemittance {
    /// Creates a PENDING incoming remittance.
    ///
    /// # Errors
    ///
    /// Fails unless the amount is positive rials and the rate is positive.
    pub fn new(input: NewRemittance, sell_rate_cad: Decimal, now: DateTime<Utc>) -> Result<Self, RemittanceError> {
        let equivalent_cad = validate_new(input.amount_irr, sell_rate_cad)?;
        Ok(Self {
            id: IncomingRemittanceId::new(),
            tenant_id: input.tenant_id,
            client_id: input.client_id,
            reference: input.reference,
            amount_irr: input.amount_irr,
            sell_rate_cad,
            equivalent_cad,
            allocated_irr: Money::zero(CurrencyCode::IRR),
            remaining_irr: input.amount_irr,
            status: IncomingStatus::Pending,
            paid_at: None,
            created_by: input.created_by,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns the remittance after allocating `amount` rials to an outgoing debt.
    ///
    /// A PAID remittance keeps its status; otherwise it becomes COMPLETED once
    /// nothing remains and PARTIAL before that.
    ///
    /// # Errors
    ///
    /// Fails if the remittance is completed or cancelled, or the amount is not
    /// positive or exceeds the remaining balance.
    pub fn apply_allocation(&self, amount: Money, now: DateTime<Utc>) -> Result<Self, RemittanceError> {
        if !self.status.accepts_allocation() {
            return Err(RemittanceError::IncomingNotSettleable {
                id: self.id,
                status: self.status,
            });
        }
        let remaining_irr = validate_take(amount, self.remaining_irr)?;

        let mut next = self.clone();
        next.allocated_irr = self.allocated_irr.checked_add(amount)?;
        next.remaining_irr = remaining_irr;
        next.status = match self.status {
            IncomingStatus::Paid => IncomingStatus::Paid,
            _ if remaining_irr.is_zero() => IncomingStatus::Completed,
            _ => IncomingStatus::Partial,
        };
        next.updated_at = now;
        Ok(next)
    }

    /// Returns the remittance marked as paid out to the recipient.
    ///
    /// # Errors
    ///
    /// Fails if it is already PAID or CANCELLED.
    pub fn mark_paid(&self, now: DateTime<Utc>) -> Result<Self, RemittanceError> {
        if matches!(self.status, IncomingStatus::Paid | IncomingStatus::Cancelled) {
            return Err(RemittanceError::InvalidTransition {
                from: self.status.to_string(),
                to: IncomingStatus::Paid.to_string(),
            });
        }
        let mut next = self.clone();
        next.status = IncomingStatus::Paid;
        next.paid_at = Some(now);
        next.updated_at = now;
        Ok(next)
    }

    /// Returns the remittance cancelled.
    ///
    /// # Errors
    ///
    /// Fails unless the remittance is PENDING or PARTIAL.
    pub fn cancel(&self, now: DateTime<Utc>) -> Result<Self, RemittanceError> {
        if !matches!(self.status, IncomingStatus::Pending | IncomingStatus::Partial) {
            return Err(RemittanceError::InvalidTransition {
                from: self.status.to_string(),
                to: IncomingStatus::Cancelled.to_string(),
            });
        }
        let mut next = self.clone();
        next.status = IncomingStatus::Cancelled;
        next.updated_at = now;
        Ok(next)
    }
}

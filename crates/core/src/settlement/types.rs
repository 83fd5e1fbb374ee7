//! Settlement records, proposals and strategies.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sarraf_shared::types::{
    IncomingRemittanceId, LedgerEntryId, Money, OutgoingRemittanceId, SettlementId, TenantId, UserId,
};

use super::error::SettlementError;

/// Order in which open outgoing debts are matched against an incoming credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Oldest debt first.
    Fifo,
    /// Newest debt first.
    Lifo,
    /// Highest buy rate first; ties go to the oldest.
    BestRate,
    /// Every candidate in creation order, for the operator to pick from.
    Manual,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fifo => "fifo",
            Self::Lifo => "lifo",
            Self::BestRate => "best_rate",
            Self::Manual => "manual",
        })
    }
}

impl FromStr for Strategy {
    type Err = SettlementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fifo" => Ok(Self::Fifo),
            "lifo" => Ok(Self::Lifo),
            "best_rate" => Ok(Self::BestRate),
            "manual" => Ok(Self::Manual),
            _ => Err(SettlementError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Immutable join of one outgoing debt and one incoming credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemittanceSettlement {
    /// Settlement ID.
    pub id: SettlementId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Debt retired.
    pub outgoing_id: OutgoingRemittanceId,
    /// Credit consumed.
    pub incoming_id: IncomingRemittanceId,
    /// Rials matched.
    pub settled_irr: Money,
    /// Outgoing buy rate at settlement time.
    pub outgoing_buy_rate: Decimal,
    /// Incoming sell rate at settlement time.
    pub incoming_sell_rate: Decimal,
    /// `settled_irr * (1/incoming_sell_rate - 1/outgoing_buy_rate)` in CAD.
    pub profit_cad: Money,
    /// SETTLEMENT entry recording the profit.
    pub ledger_entry_id: LedgerEntryId,
    /// Client key the settlement was requested under.
    pub idempotency_key: Option<String>,
    /// Operator.
    pub created_by: UserId,
    /// Commit time.
    pub created_at: DateTime<Utc>,
}

/// One proposed match; nothing is mutated by proposing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementProposal {
    /// Candidate debt.
    pub outgoing_id: OutgoingRemittanceId,
    /// Rials that would be settled.
    pub proposed_irr: Money,
    /// Candidate's buy rate.
    pub outgoing_buy_rate: Decimal,
    /// Profit the match would realize.
    pub projected_profit_cad: Money,
}

/// A request to execute one settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRequest {
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Debt to retire.
    pub outgoing_id: OutgoingRemittanceId,
    /// Credit to consume.
    pub incoming_id: IncomingRemittanceId,
    /// Rials to settle.
    pub amount_irr: Money,
    /// Operator.
    pub actor: UserId,
    /// Client key for safe retries.
    pub idempotency_key: Option<String>,
}

impl SettlementRequest {
    /// Identifies the request body for idempotency-key reuse checks.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.outgoing_id, self.incoming_id, self.amount_irr.amount, self.amount_irr.currency
        )
    }
}

/// Result of auto-settling one incoming remittance.
///
/// Settlements committed before a failure stay committed and are listed here.
#[derive(Debug)]
pub struct AutoSettleOutcome {
    /// Settlements created, in execution order.
    pub settlements: Vec<RemittanceSettlement>,
    /// First failure, which stopped the run.
    pub error: Option<SettlementError>,
}

impl AutoSettleOutcome {
    /// Returns true if every proposal was executed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

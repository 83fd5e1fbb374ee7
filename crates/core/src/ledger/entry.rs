//! Ledger entry domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sarraf_shared::types::{ClientId, LedgerEntryId, Money, TenantId, TransactionId, UserId};

/// Type of ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    /// Client handed funds to the exchange.
    Deposit,
    /// Exchange paid funds out to the client.
    Withdrawal,
    /// Destination leg of an exchange (credit in the bought currency).
    #[serde(alias = "EXCHANGE_IN")]
    FxBuy,
    /// Source leg of an exchange (debit in the sold currency).
    #[serde(alias = "EXCHANGE_OUT")]
    FxSell,
    /// Realized settlement profit.
    Settlement,
    /// Negation of an earlier entry.
    Reversal,
    /// Operator correction.
    Adjustment,
}

/// One signed movement on a client's per-currency balance.
///
/// Positive amounts are credits (the exchange owes the client), negative
/// amounts are debits. Entries are never mutated once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier for this entry.
    pub id: LedgerEntryId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Client whose balance moves.
    pub client_id: ClientId,
    /// Kind of movement.
    pub entry_type: EntryType,
    /// Signed amount.
    pub amount: Money,
    /// Other leg of an FX pair, or the entry a REVERSAL negates.
    pub related_entry_id: Option<LedgerEntryId>,
    /// Business transaction that caused the entry.
    pub source_transaction_id: Option<TransactionId>,
    /// Free-text note.
    pub description: Option<String>,
    /// Operator who posted it.
    pub created_by: UserId,
    /// Append time.
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Returns true for a credit (exchange owes the client).
    #[must_use]
    pub fn is_credit(&self) -> bool {
        self.amount.is_positive()
    }

    /// Returns true for a debit (client owes the exchange).
    #[must_use]
    pub fn is_debit(&self) -> bool {
        self.amount.is_negative()
    }

    /// Builds the REVERSAL that cancels this entry's effect.
    #[must_use]
    pub fn reversal(&self, reason: &str, actor: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: LedgerEntryId::new(),
            tenant_id: self.tenant_id,
            client_id: self.client_id,
            entry_type: EntryType::Reversal,
            amount: self.amount.negate(),
            related_entry_id: Some(self.id),
            source_transaction_id: self.source_transaction_id,
            description: Some(reason.to_string()),
            created_by: actor,
            created_at: now,
        }
    }
}

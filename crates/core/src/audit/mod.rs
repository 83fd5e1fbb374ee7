//! Audit event emission.
//!
//! Every state-changing operation emits one [`AuditEvent`]. Storage of the
//! events belongs to the sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sarraf_shared::types::{TenantId, UserId};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Remittance recorded.
    RemittanceCreated,
    /// Remittance cancelled.
    RemittanceCancelled,
    /// Incoming remittance paid out to the recipient.
    RemittancePaid,
    /// Settlement executed.
    SettlementExecuted,
    /// Ledger entry posted.
    EntryPosted,
    /// FX pair posted.
    ExchangePosted,
    /// Ledger entry reversed.
    EntryReversed,
    /// Cash balance adjusted by an operator.
    BalanceAdjusted,
    /// Daily reconciliation recorded.
    ReconciliationCreated,
    /// Payment transaction opened.
    TransactionCreated,
    /// Payment recorded.
    PaymentRecorded,
    /// Payment cancelled.
    PaymentCancelled,
}

impl AuditAction {
    /// Stable string form used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RemittanceCreated => "remittance_created",
            Self::RemittanceCancelled => "remittance_cancelled",
            Self::RemittancePaid => "remittance_paid",
            Self::SettlementExecuted => "settlement_executed",
            Self::EntryPosted => "entry_posted",
            Self::ExchangePosted => "exchange_posted",
            Self::EntryReversed => "entry_reversed",
            Self::BalanceAdjusted => "balance_adjusted",
            Self::ReconciliationCreated => "reconciliation_created",
            Self::TransactionCreated => "transaction_created",
            Self::PaymentRecorded => "payment_recorded",
            Self::PaymentCancelled => "payment_cancelled",
        }
    }
}

/// One structured audit record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEvent {
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Operator who caused the change.
    pub actor: UserId,
    /// What happened.
    pub action: AuditAction,
    /// Entity kind, e.g. "outgoing_remittance".
    pub entity_type: &'static str,
    /// Entity ID.
    pub entity_id: String,
    /// Snapshot before the change.
    pub before: Option<Value>,
    /// Snapshot after the change.
    pub after: Option<Value>,
    /// When the change committed.
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    /// Starts an event without snapshots.
    pub fn new(
        tenant_id: TenantId,
        actor: UserId,
        action: AuditAction,
        entity_type: &'static str,
        entity_id: impl ToString,
    ) -> Self {
        Self {
            tenant_id,
            actor,
            action,
            entity_type,
            entity_id: entity_id.to_string(),
            before: None,
            after: None,
            occurred_at: Utc::now(),
        }
    }

    /// Attaches the before snapshot.
    #[must_use]
    pub fn before<T: Serialize>(mut self, value: &T) -> Self {
        self.before = snapshot(value);
        self
    }

    /// Attaches the after snapshot.
    #[must_use]
    pub fn after<T: Serialize>(mut self, value: &T) -> Self {
        self.after = snapshot(value);
        self
    }
}

fn snapshot<T: Serialize>(value: &T) -> Option<Value> {
    match serde_json::to_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(error = %e, "audit snapshot could not be serialized");
            None
        }
    }
}

/// Destination of audit events.
pub trait AuditSink: Send + Sync {
    /// Records one event. Must not fail the calling operation.
    fn emit(&self, event: AuditEvent);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshots_are_json() {
        let event = AuditEvent::new(
            TenantId::new(),
            UserId::new(),
            AuditAction::BalanceAdjusted,
            "cash_balance",
            "scope-1",
        )
        .before(&json!({"final": "10.00"}))
        .after(&json!({"final": "15.00"}));

        assert_eq!(event.before, Some(json!({"final": "10.00"})));
        assert_eq!(event.after, Some(json!({"final": "15.00"})));
        assert_eq!(event.entity_id, "scope-1");
    }

    #[test]
    fn test_action_serde_matches_as_str() {
        let json = serde_json::to_value(AuditAction::SettlementExecuted).unwrap();
        assert_eq!(json, json!(AuditAction::SettlementExecuted.as_str()));
    }
}

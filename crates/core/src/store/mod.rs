//! Persistence ports.
//!
//! Services never touch storage directly; they read versioned rows through these
//! traits and hand back complete changesets. An implementation must apply each
//! `commit_*` call all-or-nothing and reject it when any row's version moved
//! since it was read.

mod error;

pub use error::StoreError;

use async_trait::async_trait;
use chrono::NaiveDate;
use sarraf_shared::types::{
    BranchId, ClientId, CurrencyCode, IncomingRemittanceId, LedgerEntryId, OutgoingRemittanceId,
    PaymentId, TenantId, TransactionId,
};
use serde::{Deserialize, Serialize};

use crate::cash::{CashAdjustment, CashBalance, CashMovement, CashScope, DailyReconciliation};
use crate::ledger::LedgerEntry;
use crate::payment::{Payment, PaymentTransaction};
use crate::remittance::{IncomingRemittance, OutgoingRemittance};
use crate::settlement::RemittanceSettlement;
use crate::tenant::{Client, Tenant};

/// A row together with the version it was read at.
///
/// When handed back in a commit, `value` is the new state and `version` the
/// version the caller expects the stored row to still have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned<T> {
    /// Row contents.
    pub value: T,
    /// Monotonic row version, starting at 1.
    pub version: u64,
}

impl<T> Versioned<T> {
    /// Wraps a value at the given version.
    pub fn new(value: T, version: u64) -> Self {
        Self { value, version }
    }

    /// Replaces the value, keeping the version the row was read at.
    #[must_use]
    pub fn with_value<U>(&self, value: U) -> Versioned<U> {
        Versioned {
            value,
            version: self.version,
        }
    }
}

/// Read-only lookup of tenants and clients.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Loads a tenant.
    async fn tenant(&self, tenant_id: TenantId) -> Result<Tenant, StoreError>;

    /// Loads a client of the tenant, deleted ones included.
    async fn client(&self, tenant_id: TenantId, client_id: ClientId) -> Result<Client, StoreError>;
}

/// Narrows a settlement listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettlementFilter {
    /// Only settlements touching this outgoing remittance.
    pub outgoing_id: Option<OutgoingRemittanceId>,
    /// Only settlements touching this incoming remittance.
    pub incoming_id: Option<IncomingRemittanceId>,
}

impl SettlementFilter {
    /// Returns true if the settlement passes the filter.
    #[must_use]
    pub fn matches(&self, settlement: &RemittanceSettlement) -> bool {
        self.outgoing_id.is_none_or(|id| settlement.outgoing_id == id)
            && self.incoming_id.is_none_or(|id| settlement.incoming_id == id)
    }
}

/// Everything one executed settlement writes.
#[derive(Debug, Clone)]
pub struct SettlementCommit {
    /// Tenant owning every row below.
    pub tenant_id: TenantId,
    /// Updated outgoing remittance at its read version.
    pub outgoing: Versioned<OutgoingRemittance>,
    /// Updated incoming remittance at its read version.
    pub incoming: Versioned<IncomingRemittance>,
    /// New settlement record.
    pub settlement: RemittanceSettlement,
    /// Profit entry for the tenant's house client.
    pub ledger_entry: LedgerEntry,
}

/// Remittance and settlement storage.
#[async_trait]
pub trait RemittanceStore: Send + Sync {
    /// Stores a new outgoing remittance at version 1.
    async fn insert_outgoing(
        &self,
        remittance: OutgoingRemittance,
    ) -> Result<Versioned<OutgoingRemittance>, StoreError>;

    /// Stores a new incoming remittance at version 1.
    async fn insert_incoming(
        &self,
        remittance: IncomingRemittance,
    ) -> Result<Versioned<IncomingRemittance>, StoreError>;

    /// Loads an outgoing remittance of the tenant.
    async fn outgoing(
        &self,
        tenant_id: TenantId,
        id: OutgoingRemittanceId,
    ) -> Result<Versioned<OutgoingRemittance>, StoreError>;

    /// Loads an incoming remittance of the tenant.
    async fn incoming(
        &self,
        tenant_id: TenantId,
        id: IncomingRemittanceId,
    ) -> Result<Versioned<IncomingRemittance>, StoreError>;

    /// Lists the tenant's outgoing remittances in creation order.
    async fn list_outgoing(&self, tenant_id: TenantId) -> Result<Vec<Versioned<OutgoingRemittance>>, StoreError>;

    /// Lists the tenant's incoming remittances in creation order.
    async fn list_incoming(&self, tenant_id: TenantId) -> Result<Vec<Versioned<IncomingRemittance>>, StoreError>;

    /// Settlement candidates: open outgoing remittances of the tenant.
    async fn open_outgoing(&self, tenant_id: TenantId) -> Result<Vec<Versioned<OutgoingRemittance>>, StoreError> {
        let mut rows = self.list_outgoing(tenant_id).await?;
        rows.retain(|row| row.value.is_open());
        Ok(rows)
    }

    /// Replaces an outgoing remittance if its version is unchanged.
    async fn update_outgoing(
        &self,
        row: Versioned<OutgoingRemittance>,
    ) -> Result<Versioned<OutgoingRemittance>, StoreError>;

    /// Replaces an incoming remittance if its version is unchanged.
    async fn update_incoming(
        &self,
        row: Versioned<IncomingRemittance>,
    ) -> Result<Versioned<IncomingRemittance>, StoreError>;

    /// Applies a settlement changeset atomically.
    async fn commit_settlement(&self, commit: SettlementCommit) -> Result<RemittanceSettlement, StoreError>;

    /// Lists the tenant's settlements in creation order.
    async fn settlements(
        &self,
        tenant_id: TenantId,
        filter: SettlementFilter,
    ) -> Result<Vec<RemittanceSettlement>, StoreError>;
}

/// Append-only client ledger storage.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Appends entries atomically, all or none.
    ///
    /// Must reject a second REVERSAL of the same original with `Duplicate`.
    async fn append_entries(
        &self,
        tenant_id: TenantId,
        entries: Vec<LedgerEntry>,
    ) -> Result<Vec<LedgerEntry>, StoreError>;

    /// Loads one entry.
    async fn entry(&self, tenant_id: TenantId, id: LedgerEntryId) -> Result<LedgerEntry, StoreError>;

    /// Entries of a client in append order, optionally for one currency.
    async fn entries_for_client(
        &self,
        tenant_id: TenantId,
        client_id: ClientId,
        currency: Option<CurrencyCode>,
    ) -> Result<Vec<LedgerEntry>, StoreError>;

    /// The REVERSAL entry pointing at `id`, if any.
    async fn reversal_of(&self, tenant_id: TenantId, id: LedgerEntryId) -> Result<Option<LedgerEntry>, StoreError>;
}

/// A cash balance write, optionally logging the adjustment that caused it.
#[derive(Debug, Clone)]
pub struct BalanceWrite {
    /// New balance row.
    pub balance: CashBalance,
    /// Version the row was read at; `None` creates the row.
    pub expected_version: Option<u64>,
    /// Adjustment log row written in the same commit.
    pub adjustment: Option<CashAdjustment>,
}

/// A reconciliation record and the checkpoint moves it causes.
#[derive(Debug, Clone)]
pub struct ReconciliationCommit {
    /// The immutable reconciliation record.
    pub record: DailyReconciliation,
    /// Balance rows whose checkpoint advances.
    pub balances: Vec<BalanceWrite>,
}

/// Branch cash storage.
#[async_trait]
pub trait CashStore: Send + Sync {
    /// Loads the balance row of a scope, if one exists.
    async fn balance(&self, scope: &CashScope) -> Result<Option<Versioned<CashBalance>>, StoreError>;

    /// Appends a movement; the store assigns its sequence number.
    async fn append_movement(&self, movement: CashMovement) -> Result<CashMovement, StoreError>;

    /// Movements of a scope with a sequence number above `after`.
    async fn movements_after(&self, scope: &CashScope, after: u64) -> Result<Vec<CashMovement>, StoreError>;

    /// Writes a balance row (and its adjustment log entry) atomically.
    async fn save_balance(&self, write: BalanceWrite) -> Result<Versioned<CashBalance>, StoreError>;

    /// Adjustment history of a scope, oldest first.
    async fn adjustments(&self, scope: &CashScope) -> Result<Vec<CashAdjustment>, StoreError>;

    /// Stores a reconciliation and advances the checkpoints atomically.
    async fn commit_reconciliation(&self, commit: ReconciliationCommit) -> Result<DailyReconciliation, StoreError>;

    /// Reconciliations of a branch on a date, oldest first.
    async fn reconciliations(
        &self,
        tenant_id: TenantId,
        branch_id: BranchId,
        date: NaiveDate,
    ) -> Result<Vec<DailyReconciliation>, StoreError>;
}

/// Everything one payment record or cancellation writes.
#[derive(Debug, Clone)]
pub struct PaymentCommit {
    /// Tenant owning every row below.
    pub tenant_id: TenantId,
    /// Updated transaction totals at the read version.
    pub transaction: Versioned<PaymentTransaction>,
    /// Payment row to insert or replace.
    pub payment: Payment,
    /// Cash leg appended in the same commit.
    pub cash_movement: Option<CashMovement>,
}

/// Transaction and payment storage.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Stores a new transaction at version 1.
    async fn insert_transaction(
        &self,
        transaction: PaymentTransaction,
    ) -> Result<Versioned<PaymentTransaction>, StoreError>;

    /// Loads a transaction.
    async fn transaction(
        &self,
        tenant_id: TenantId,
        id: TransactionId,
    ) -> Result<Versioned<PaymentTransaction>, StoreError>;

    /// Loads a payment.
    async fn payment(&self, tenant_id: TenantId, id: PaymentId) -> Result<Payment, StoreError>;

    /// Payments of a transaction, cancelled ones included, oldest first.
    async fn payments_for(&self, tenant_id: TenantId, transaction_id: TransactionId) -> Result<Vec<Payment>, StoreError>;

    /// Applies a payment changeset atomically, returning the stored cash leg.
    async fn commit_payment(&self, commit: PaymentCommit) -> Result<Option<CashMovement>, StoreError>;
}

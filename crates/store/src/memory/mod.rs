//! In-memory implementation of the storage ports.
//!
//! State is sharded per tenant: a `DashMap` maps each tenant to its own
//! mutex-guarded tables. A commit locks exactly one tenant, checks every row
//! version it carries, and only then applies its writes, so each `commit_*`
//! call is all-or-nothing and tenants never contend with each other.

mod cash;
mod ledger;
mod payment;
mod remittance;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use sarraf_core::cash::{CashAdjustment, CashBalance, CashMovement, CashScope, DailyReconciliation};
use sarraf_core::ledger::LedgerEntry;
use sarraf_core::payment::{Payment, PaymentTransaction};
use sarraf_core::remittance::{IncomingRemittance, OutgoingRemittance};
use sarraf_core::settlement::RemittanceSettlement;
use sarraf_core::store::{StoreError, TenantDirectory, Versioned};
use sarraf_core::tenant::{Client, RecordState, Tenant};
use sarraf_shared::types::{
    ClientId, CurrencyCode, IncomingRemittanceId, LedgerEntryId, OutgoingRemittanceId, TenantId,
    TransactionId,
};

/// Every table of one tenant.
struct TenantState {
    tenant: Tenant,
    clients: HashMap<ClientId, Client>,
    outgoing: HashMap<OutgoingRemittanceId, Versioned<OutgoingRemittance>>,
    incoming: HashMap<IncomingRemittanceId, Versioned<IncomingRemittance>>,
    settlements: Vec<RemittanceSettlement>,
    ledger: Vec<LedgerEntry>,
    /// Original entry -> its REVERSAL.
    reversals: HashMap<LedgerEntryId, LedgerEntryId>,
    movements: Vec<CashMovement>,
    last_sequence: u64,
    balances: HashMap<CashScope, Versioned<CashBalance>>,
    adjustments: Vec<CashAdjustment>,
    reconciliations: Vec<DailyReconciliation>,
    transactions: HashMap<TransactionId, Versioned<PaymentTransaction>>,
    payments: Vec<Payment>,
}

impl TenantState {
    fn new(tenant: Tenant) -> Self {
        Self {
            tenant,
            clients: HashMap::new(),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
            settlements: Vec::new(),
            ledger: Vec::new(),
            reversals: HashMap::new(),
            movements: Vec::new(),
            last_sequence: 0,
            balances: HashMap::new(),
            adjustments: Vec::new(),
            reconciliations: Vec::new(),
            transactions: HashMap::new(),
            payments: Vec::new(),
        }
    }

    /// Appends a movement with the next sequence number.
    fn push_movement(&mut self, mut movement: CashMovement) -> CashMovement {
        self.last_sequence += 1;
        movement.sequence = self.last_sequence;
        self.movements.push(movement.clone());
        movement
    }
}

/// Fails with `VersionConflict` unless the stored row is still at `expected`.
fn check_version(entity: &'static str, id: impl ToString, expected: u64, actual: u64) -> Result<(), StoreError> {
    if expected == actual {
        Ok(())
    } else {
        tracing::debug!(entity, expected, actual, "stale write rejected");
        Err(StoreError::VersionConflict {
            entity,
            id: id.to_string(),
            expected,
            actual,
        })
    }
}

/// Sorts rows oldest first, ties broken by ID.
fn creation_order<T, K: Ord>(rows: &mut [Versioned<T>], key: impl Fn(&T) -> (DateTime<Utc>, K)) {
    rows.sort_by(|a, b| key(&a.value).cmp(&key(&b.value)));
}

/// Tenant-sharded in-memory store implementing every port.
#[derive(Default)]
pub struct MemoryStore {
    tenants: DashMap<TenantId, Arc<Mutex<TenantState>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tenant together with its house client.
    pub fn register_tenant(&self, name: &str, base_currency: CurrencyCode) -> Tenant {
        let (tenant, house) = Tenant::with_house_client(name, base_currency);
        let mut state = TenantState::new(tenant.clone());
        state.clients.insert(house.id, house);
        self.tenants.insert(tenant.id, Arc::new(Mutex::new(state)));
        tracing::info!(tenant_id = %tenant.id, name, "tenant registered");
        tenant
    }

    /// Adds an active client to a tenant.
    pub fn add_client(&self, tenant_id: TenantId, name: &str) -> Result<Client, StoreError> {
        let client = Client::new(tenant_id, name);
        self.state(tenant_id)?.lock().clients.insert(client.id, client.clone());
        Ok(client)
    }

    /// Soft-deletes a client; its ledger history stays.
    pub fn delete_client(&self, tenant_id: TenantId, client_id: ClientId) -> Result<Client, StoreError> {
        let state = self.state(tenant_id)?;
        let mut guard = state.lock();
        let client = guard
            .clients
            .get_mut(&client_id)
            .ok_or_else(|| StoreError::not_found("client", client_id))?;
        client.state = RecordState::Deleted { deleted_at: Utc::now() };
        Ok(client.clone())
    }

    /// The tenant's tables; the shard lock is released before returning.
    fn state(&self, tenant_id: TenantId) -> Result<Arc<Mutex<TenantState>>, StoreError> {
        self.tenants
            .get(&tenant_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| StoreError::not_found("tenant", tenant_id))
    }
}

#[async_trait]
impl TenantDirectory for MemoryStore {
    async fn tenant(&self, tenant_id: TenantId) -> Result<Tenant, StoreError> {
        Ok(self.state(tenant_id)?.lock().tenant.clone())
    }

    async fn client(&self, tenant_id: TenantId, client_id: ClientId) -> Result<Client, StoreError> {
        self.state(tenant_id)?
            .lock()
            .clients
            .get(&client_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("client", client_id))
    }
}

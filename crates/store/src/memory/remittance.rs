//! Remittance and settlement tables.

use async_trait::async_trait;
use sarraf_core::remittance::{IncomingRemittance, OutgoingRemittance};
use sarraf_core::settlement::RemittanceSettlement;
use sarraf_core::store::{RemittanceStore, SettlementCommit, SettlementFilter, StoreError, Versioned};
use sarraf_shared::types::{IncomingRemittanceId, OutgoingRemittanceId, TenantId};

use super::{check_version, creation_order, MemoryStore};

#[async_trait]
impl RemittanceStore for MemoryStore {
    async fn insert_outgoing(
        &self,
        remittance: OutgoingRemittance,
    ) -> Result<Versioned<OutgoingRemittance>, StoreError> {
        let state = self.state(remittance.tenant_id)?;
        let mut guard = state.lock();
        if guard.outgoing.contains_key(&remittance.id) {
            return Err(StoreError::Duplicate {
                entity: "outgoing_remittance",
                id: remittance.id.to_string(),
            });
        }
        let row = Versioned::new(remittance, 1);
        guard.outgoing.insert(row.value.id, row.clone());
        Ok(row)
    }

    async fn insert_incoming(
        &self,
        remittance: IncomingRemittance,
    ) -> Result<Versioned<IncomingRemittance>, StoreError> {
        let state = self.state(remittance.tenant_id)?;
        let mut guard = state.lock();
        if guard.incoming.contains_key(&remittance.id) {
            return Err(StoreError::Duplicate {
                entity: "incoming_remittance",
                id: remittance.id.to_string(),
            });
        }
        let row = Versioned::new(remittance, 1);
        guard.incoming.insert(row.value.id, row.clone());
        Ok(row)
    }

    async fn outgoing(
        &self,
        tenant_id: TenantId,
        id: OutgoingRemittanceId,
    ) -> Result<Versioned<OutgoingRemittance>, StoreError> {
        self.state(tenant_id)?
            .lock()
            .outgoing
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("outgoing_remittance", id))
    }

    async fn incoming(
        &self,
        tenant_id: TenantId,
        id: IncomingRemittanceId,
    ) -> Result<Versioned<IncomingRemittance>, StoreError> {
        self.state(tenant_id)?
            .lock()
            .incoming
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("incoming_remittance", id))
    }

    async fn list_outgoing(&self, tenant_id: TenantId) -> Result<Vec<Versioned<OutgoingRemittance>>, StoreError> {
        let mut rows: Vec<_> = self.state(tenant_id)?.lock().outgoing.values().cloned().collect();
        creation_order(&mut rows, |r| (r.created_at, r.id));
        Ok(rows)
    }

    async fn list_incoming(&self, tenant_id: TenantId) -> Result<Vec<Versioned<IncomingRemittance>>, StoreError> {
        let mut rows: Vec<_> = self.state(tenant_id)?.lock().incoming.values().cloned().collect();
        creation_order(&mut rows, |r| (r.created_at, r.id));
        Ok(rows)
    }

    async fn update_outgoing(
        &self,
        row: Versioned<OutgoingRemittance>,
    ) -> Result<Versioned<OutgoingRemittance>, StoreError> {
        let state = self.state(row.value.tenant_id)?;
        let mut guard = state.lock();
        let stored = guard
            .outgoing
            .get_mut(&row.value.id)
            .ok_or_else(|| StoreError::not_found("outgoing_remittance", row.value.id))?;
        check_version("outgoing_remittance", row.value.id, row.version, stored.version)?;
        *stored = Versioned::new(row.value, row.version + 1);
        Ok(stored.clone())
    }

    async fn update_incoming(
        &self,
        row: Versioned<IncomingRemittance>,
    ) -> Result<Versioned<IncomingRemittance>, StoreError> {
        let state = self.state(row.value.tenant_id)?;
        let mut guard = state.lock();
        let stored = guard
            .incoming
            .get_mut(&row.value.id)
            .ok_or_else(|| StoreError::not_found("incoming_remittance", row.value.id))?;
        check_version("incoming_remittance", row.value.id, row.version, stored.version)?;
        *stored = Versioned::new(row.value, row.version + 1);
        Ok(stored.clone())
    }

    async fn commit_settlement(&self, commit: SettlementCommit) -> Result<RemittanceSettlement, StoreError> {
        let state = self.state(commit.tenant_id)?;
        let mut guard = state.lock();

        // Validate everything before touching any table.
        let out_id = commit.outgoing.value.id;
        let in_id = commit.incoming.value.id;
        let out_version = guard
            .outgoing
            .get(&out_id)
            .map(|r| r.version)
            .ok_or_else(|| StoreError::not_found("outgoing_remittance", out_id))?;
        let in_version = guard
            .incoming
            .get(&in_id)
            .map(|r| r.version)
            .ok_or_else(|| StoreError::not_found("incoming_remittance", in_id))?;
        check_version("outgoing_remittance", out_id, commit.outgoing.version, out_version)?;
        check_version("incoming_remittance", in_id, commit.incoming.version, in_version)?;
        if guard.settlements.iter().any(|s| s.id == commit.settlement.id) {
            return Err(StoreError::Duplicate {
                entity: "settlement",
                id: commit.settlement.id.to_string(),
            });
        }

        guard
            .outgoing
            .insert(out_id, Versioned::new(commit.outgoing.value, out_version + 1));
        guard
            .incoming
            .insert(in_id, Versioned::new(commit.incoming.value, in_version + 1));
        guard.ledger.push(commit.ledger_entry);
        guard.settlements.push(commit.settlement.clone());
        Ok(commit.settlement)
    }

    async fn settlements(
        &self,
        tenant_id: TenantId,
        filter: SettlementFilter,
    ) -> Result<Vec<RemittanceSettlement>, StoreError> {
        Ok(self
            .state(tenant_id)?
            .lock()
            .settlements
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }
}

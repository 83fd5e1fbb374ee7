//! Append-only ledger table.

use std::collections::HashSet;

use async_trait::async_trait;
use sarraf_core::ledger::{EntryType, LedgerEntry};
use sarraf_core::store::{LedgerStore, StoreError};
use sarraf_shared::types::{ClientId, CurrencyCode, LedgerEntryId, TenantId};

use super::MemoryStore;

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn append_entries(
        &self,
        tenant_id: TenantId,
        entries: Vec<LedgerEntry>,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let state = self.state(tenant_id)?;
        let mut guard = state.lock();

        let mut reversed_in_batch = HashSet::new();
        for entry in &entries {
            if entry.tenant_id != tenant_id {
                return Err(StoreError::not_found("ledger_entry", entry.id));
            }
            if entry.entry_type != EntryType::Reversal {
                continue;
            }
            if let Some(original) = entry.related_entry_id {
                if guard.reversals.contains_key(&original) || !reversed_in_batch.insert(original) {
                    return Err(StoreError::Duplicate {
                        entity: "ledger_reversal",
                        id: original.to_string(),
                    });
                }
            }
        }

        for entry in &entries {
            if let (EntryType::Reversal, Some(original)) = (entry.entry_type, entry.related_entry_id) {
                guard.reversals.insert(original, entry.id);
            }
        }
        guard.ledger.extend(entries.iter().cloned());
        Ok(entries)
    }

    async fn entry(&self, tenant_id: TenantId, id: LedgerEntryId) -> Result<LedgerEntry, StoreError> {
        self.state(tenant_id)?
            .lock()
            .ledger
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("ledger_entry", id))
    }

    async fn entries_for_client(
        &self,
        tenant_id: TenantId,
        client_id: ClientId,
        currency: Option<CurrencyCode>,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        Ok(self
            .state(tenant_id)?
            .lock()
            .ledger
            .iter()
            .filter(|e| e.client_id == client_id)
            .filter(|e| currency.is_none_or(|c| e.amount.currency == c))
            .cloned()
            .collect())
    }

    async fn reversal_of(&self, tenant_id: TenantId, id: LedgerEntryId) -> Result<Option<LedgerEntry>, StoreError> {
        let state = self.state(tenant_id)?;
        let guard = state.lock();
        let Some(reversal_id) = guard.reversals.get(&id) else {
            return Ok(None);
        };
        Ok(guard.ledger.iter().find(|e| e.id == *reversal_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use sarraf_shared::types::{Money, UserId};

    fn deposit(tenant_id: TenantId, client_id: ClientId) -> LedgerEntry {
        LedgerEntry {
            id: LedgerEntryId::new(),
            tenant_id,
            client_id,
            entry_type: EntryType::Deposit,
            amount: Money::new(dec!(100), CurrencyCode::CAD),
            related_entry_id: None,
            source_transaction_id: None,
            description: None,
            created_by: UserId::new(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_second_reversal_is_duplicate() {
        let store = MemoryStore::new();
        let tenant = store.register_tenant("T", CurrencyCode::CAD);
        let original = deposit(tenant.id, tenant.house_client_id);
        store.append_entries(tenant.id, vec![original.clone()]).await.unwrap();

        let first = original.reversal("typo", UserId::new(), Utc::now());
        store.append_entries(tenant.id, vec![first.clone()]).await.unwrap();
        assert_eq!(store.reversal_of(tenant.id, original.id).await.unwrap(), Some(first));

        let second = original.reversal("again", UserId::new(), Utc::now());
        let err = store.append_entries(tenant.id, vec![second]).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
        assert_eq!(
            store.entries_for_client(tenant.id, tenant.house_client_id, None).await.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let store = MemoryStore::new();
        let tenant = store.register_tenant("T", CurrencyCode::CAD);
        let good = deposit(tenant.id, tenant.house_client_id);
        let foreign = deposit(TenantId::new(), tenant.house_client_id);

        assert!(store.append_entries(tenant.id, vec![good, foreign]).await.is_err());
        assert!(store
            .entries_for_client(tenant.id, tenant.house_client_id, Some(CurrencyCode::CAD))
            .await
            .unwrap()
            .is_empty());
    }
}

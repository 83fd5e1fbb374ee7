//! Payment transactions and payments.

use async_trait::async_trait;
use sarraf_core::cash::CashMovement;
use sarraf_core::payment::{Payment, PaymentTransaction};
use sarraf_core::store::{PaymentCommit, PaymentStore, StoreError, Versioned};
use sarraf_shared::types::{PaymentId, TenantId, TransactionId};

use super::{check_version, MemoryStore};

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn insert_transaction(
        &self,
        transaction: PaymentTransaction,
    ) -> Result<Versioned<PaymentTransaction>, StoreError> {
        let state = self.state(transaction.tenant_id)?;
        let mut guard = state.lock();
        if guard.transactions.contains_key(&transaction.id) {
            return Err(StoreError::Duplicate {
                entity: "transaction",
                id: transaction.id.to_string(),
            });
        }
        let row = Versioned::new(transaction, 1);
        guard.transactions.insert(row.value.id, row.clone());
        Ok(row)
    }

    async fn transaction(
        &self,
        tenant_id: TenantId,
        id: TransactionId,
    ) -> Result<Versioned<PaymentTransaction>, StoreError> {
        self.state(tenant_id)?
            .lock()
            .transactions
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("transaction", id))
    }

    async fn payment(&self, tenant_id: TenantId, id: PaymentId) -> Result<Payment, StoreError> {
        self.state(tenant_id)?
            .lock()
            .payments
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("payment", id))
    }

    async fn payments_for(&self, tenant_id: TenantId, transaction_id: TransactionId) -> Result<Vec<Payment>, StoreError> {
        Ok(self
            .state(tenant_id)?
            .lock()
            .payments
            .iter()
            .filter(|p| p.transaction_id == transaction_id)
            .cloned()
            .collect())
    }

    async fn commit_payment(&self, commit: PaymentCommit) -> Result<Option<CashMovement>, StoreError> {
        let state = self.state(commit.tenant_id)?;
        let mut guard = state.lock();

        let txn_id = commit.transaction.value.id;
        let actual = guard
            .transactions
            .get(&txn_id)
            .map(|r| r.version)
            .ok_or_else(|| StoreError::not_found("transaction", txn_id))?;
        check_version("transaction", txn_id, commit.transaction.version, actual)?;
        if commit.payment.transaction_id != txn_id {
            return Err(StoreError::not_found("payment", commit.payment.id));
        }

        guard
            .transactions
            .insert(txn_id, Versioned::new(commit.transaction.value, actual + 1));
        match guard.payments.iter().position(|p| p.id == commit.payment.id) {
            Some(i) => guard.payments[i] = commit.payment,
            None => guard.payments.push(commit.payment),
        }
        Ok(commit.cash_movement.map(|m| guard.push_movement(m)))
    }
}

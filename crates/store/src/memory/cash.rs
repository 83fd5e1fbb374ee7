//! Cash movements, balances, adjustments and reconciliations.

use async_trait::async_trait;
use chrono::NaiveDate;
use sarraf_core::cash::{CashAdjustment, CashBalance, CashMovement, CashScope, DailyReconciliation};
use sarraf_core::store::{BalanceWrite, CashStore, ReconciliationCommit, StoreError, Versioned};
use sarraf_shared::types::{BranchId, TenantId};

use super::{check_version, MemoryStore, TenantState};

impl TenantState {
    /// Version the write will be stored at, or a conflict.
    fn balance_version(&self, write: &BalanceWrite) -> Result<u64, StoreError> {
        let scope = write.balance.scope;
        let actual = self.balances.get(&scope).map_or(0, |row| row.version);
        check_version("cash_balance", scope, write.expected_version.unwrap_or(0), actual)?;
        Ok(actual + 1)
    }

    fn apply_balance(&mut self, write: BalanceWrite, version: u64) -> Versioned<CashBalance> {
        let row = Versioned::new(write.balance, version);
        self.balances.insert(row.value.scope, row.clone());
        if let Some(adjustment) = write.adjustment {
            self.adjustments.push(adjustment);
        }
        row
    }
}

#[async_trait]
impl CashStore for MemoryStore {
    async fn balance(&self, scope: &CashScope) -> Result<Option<Versioned<CashBalance>>, StoreError> {
        Ok(self.state(scope.tenant_id)?.lock().balances.get(scope).cloned())
    }

    async fn append_movement(&self, movement: CashMovement) -> Result<CashMovement, StoreError> {
        Ok(self.state(movement.tenant_id)?.lock().push_movement(movement))
    }

    async fn movements_after(&self, scope: &CashScope, after: u64) -> Result<Vec<CashMovement>, StoreError> {
        Ok(self
            .state(scope.tenant_id)?
            .lock()
            .movements
            .iter()
            .filter(|m| m.sequence > after && m.scope() == *scope)
            .cloned()
            .collect())
    }

    async fn save_balance(&self, write: BalanceWrite) -> Result<Versioned<CashBalance>, StoreError> {
        let state = self.state(write.balance.scope.tenant_id)?;
        let mut guard = state.lock();
        let version = guard.balance_version(&write)?;
        Ok(guard.apply_balance(write, version))
    }

    async fn adjustments(&self, scope: &CashScope) -> Result<Vec<CashAdjustment>, StoreError> {
        Ok(self
            .state(scope.tenant_id)?
            .lock()
            .adjustments
            .iter()
            .filter(|a| a.scope == *scope)
            .cloned()
            .collect())
    }

    async fn commit_reconciliation(&self, commit: ReconciliationCommit) -> Result<DailyReconciliation, StoreError> {
        let state = self.state(commit.record.tenant_id)?;
        let mut guard = state.lock();

        let mut versions = Vec::with_capacity(commit.balances.len());
        for write in &commit.balances {
            if write.balance.scope.tenant_id != commit.record.tenant_id {
                return Err(StoreError::not_found("cash_balance", write.balance.scope));
            }
            versions.push(guard.balance_version(write)?);
        }
        for (write, version) in commit.balances.into_iter().zip(versions) {
            guard.apply_balance(write, version);
        }
        guard.reconciliations.push(commit.record.clone());
        Ok(commit.record)
    }

    async fn reconciliations(
        &self,
        tenant_id: TenantId,
        branch_id: BranchId,
        date: NaiveDate,
    ) -> Result<Vec<DailyReconciliation>, StoreError> {
        Ok(self
            .state(tenant_id)?
            .lock()
            .reconciliations
            .iter()
            .filter(|r| r.branch_id == branch_id && r.date == date)
            .cloned()
            .collect())
    }
}

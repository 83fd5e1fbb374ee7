//! Cash balance engine: movements, recalculation, adjustments, daily counts.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sarraf_shared::types::{BranchId, CashAdjustmentId, Money, ReconciliationId, TenantId, UserId};
use tracing::{info, instrument};

use super::error::CashError;
use super::types::{
    CashAdjustment, CashBalance, CashMovement, CashScope, CurrencyCount, DailyReconciliation,
    NewCashMovement, NewReconciliation, ReconciliationLine,
};
use crate::audit::{AuditAction, AuditEvent, AuditSink};
use crate::retry::RetryPolicy;
use crate::store::{BalanceWrite, CashStore, ReconciliationCommit, TenantDirectory};

/// Stored row (if any) plus the movements past its checkpoint.
struct Snapshot {
    version: Option<u64>,
    balance: CashBalance,
    movements: Vec<CashMovement>,
}

/// Maintains per-scope cash balances.
pub struct CashService {
    directory: Arc<dyn TenantDirectory>,
    store: Arc<dyn CashStore>,
    audit: Arc<dyn AuditSink>,
    retry: RetryPolicy,
}

impl CashService {
    /// Creates the service over its ports.
    pub fn new(
        directory: Arc<dyn TenantDirectory>,
        store: Arc<dyn CashStore>,
        audit: Arc<dyn AuditSink>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            directory,
            store,
            audit,
            retry,
        }
    }

    async fn snapshot(&self, scope: &CashScope) -> Result<Snapshot, CashError> {
        let (version, balance) = match self.store.balance(scope).await? {
            Some(row) => (Some(row.version), row.value),
            None => (None, CashBalance::empty(*scope, Utc::now())),
        };
        let movements = self
            .store
            .movements_after(scope, balance.checkpoint.through_sequence)
            .await?;
        Ok(Snapshot {
            version,
            balance,
            movements,
        })
    }

    /// Appends one transaction leg and refreshes the affected balance.
    ///
    /// # Errors
    ///
    /// `ZeroMovement` for a zero amount, `NotFound` for an unknown tenant.
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id, amount = %input.amount))]
    pub async fn post_cash_movement(
        &self,
        input: NewCashMovement,
    ) -> Result<(CashMovement, CashBalance), CashError> {
        if input.amount.is_zero() {
            return Err(CashError::ZeroMovement);
        }
        self.directory.tenant(input.tenant_id).await?;

        let movement = self.store.append_movement(input.into_movement(Utc::now())).await?;
        let balance = self.recalculate_auto_balance(movement.scope()).await?;
        Ok((movement, balance))
    }

    /// Recomputes `auto_calculated` from CASH legs past the checkpoint.
    #[instrument(skip(self), fields(scope = %scope))]
    pub async fn recalculate_auto_balance(&self, scope: CashScope) -> Result<CashBalance, CashError> {
        let balance = self
            .retry
            .run("recalculate_auto_balance", |_| async move {
                let snap = self.snapshot(&scope).await?;
                let next = snap.balance.refreshed(&snap.movements, Utc::now());
                let stored = self
                    .store
                    .save_balance(BalanceWrite {
                        balance: next,
                        expected_version: snap.version,
                        adjustment: None,
                    })
                    .await?;
                Ok::<_, CashError>(stored.value)
            })
            .await?;

        info!(auto = %balance.auto_calculated, final_balance = %balance.final_balance, "cash balance recalculated");
        Ok(balance)
    }

    /// Applies an operator correction and logs it.
    ///
    /// The auto balance is refreshed first, so `balance_before` is the
    /// current final balance.
    ///
    /// # Errors
    ///
    /// `ZeroAdjustment` for a zero delta, `ReasonRequired` for a blank reason.
    #[instrument(skip(self, reason), fields(scope = %scope))]
    pub async fn adjust_balance(
        &self,
        scope: CashScope,
        delta: Decimal,
        reason: &str,
        actor: UserId,
    ) -> Result<CashAdjustment, CashError> {
        if delta.is_zero() {
            return Err(CashError::ZeroAdjustment);
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(CashError::ReasonRequired);
        }
        self.directory.tenant(scope.tenant_id).await?;

        let (before, after, adjustment) = self
            .retry
            .run("adjust_balance", |_| async move {
                let snap = self.snapshot(&scope).await?;
                let current = snap.balance.refreshed(&snap.movements, Utc::now());
                let next = current.adjusted(delta);
                let adjustment = CashAdjustment {
                    id: CashAdjustmentId::new(),
                    scope,
                    delta: Money::new(delta, scope.currency),
                    reason: reason.to_string(),
                    balance_before: current.final_balance,
                    balance_after: next.final_balance,
                    adjusted_by: actor,
                    created_at: Utc::now(),
                };
                let stored = self
                    .store
                    .save_balance(BalanceWrite {
                        balance: next,
                        expected_version: snap.version,
                        adjustment: Some(adjustment.clone()),
                    })
                    .await?;
                Ok::<_, CashError>((current, stored.value, adjustment))
            })
            .await?;

        info!(
            delta = %adjustment.delta,
            balance_after = %adjustment.balance_after,
            "cash balance adjusted"
        );
        self.audit.emit(
            AuditEvent::new(scope.tenant_id, actor, AuditAction::BalanceAdjusted, "cash_balance", scope)
                .before(&before)
                .after(&after),
        );
        Ok(adjustment)
    }

    /// Current balance of a scope, refreshed but not persisted.
    pub async fn balance(&self, scope: CashScope) -> Result<CashBalance, CashError> {
        let snap = self.snapshot(&scope).await?;
        Ok(snap.balance.refreshed(&snap.movements, Utc::now()))
    }

    /// Adjustment history of a scope, oldest first.
    pub async fn adjustments(&self, scope: CashScope) -> Result<Vec<CashAdjustment>, CashError> {
        Ok(self.store.adjustments(&scope).await?)
    }

    /// Records an end-of-day count against the system balances.
    ///
    /// Every counted scope is checkpointed in the same commit. Variance is
    /// reported, never rejected. Several records per branch and day are kept.
    ///
    /// # Errors
    ///
    /// `DuplicateCurrency` if a currency is counted twice.
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id, branch_id = %input.branch_id, date = %input.date))]
    pub async fn create_daily_reconciliation(
        &self,
        input: NewReconciliation,
    ) -> Result<DailyReconciliation, CashError> {
        let mut seen = HashSet::new();
        for count in std::iter::once(&input.primary).chain(&input.breakdown) {
            if !seen.insert(count.currency) {
                return Err(CashError::DuplicateCurrency(count.currency));
            }
        }
        self.directory.tenant(input.tenant_id).await?;

        let input = &input;
        let record = self
            .retry
            .run("create_daily_reconciliation", |_| async move {
                let mut balances = Vec::new();
                let primary = self.count_line(input, &input.primary, &mut balances).await?;
                let mut breakdown = Vec::with_capacity(input.breakdown.len());
                for count in &input.breakdown {
                    breakdown.push(self.count_line(input, count, &mut balances).await?);
                }
                let record = DailyReconciliation {
                    id: ReconciliationId::new(),
                    tenant_id: input.tenant_id,
                    branch_id: input.branch_id,
                    date: input.date,
                    primary,
                    breakdown,
                    notes: input.notes.clone(),
                    created_by: input.actor,
                    created_at: Utc::now(),
                };
                let stored = self
                    .store
                    .commit_reconciliation(ReconciliationCommit { record, balances })
                    .await?;
                Ok::<_, CashError>(stored)
            })
            .await?;

        info!(
            reconciliation_id = %record.id,
            variance = %record.primary.variance,
            status = ?record.primary.status,
            "daily reconciliation recorded"
        );
        self.audit.emit(
            AuditEvent::new(
                record.tenant_id,
                record.created_by,
                AuditAction::ReconciliationCreated,
                "daily_reconciliation",
                record.id,
            )
            .after(&record),
        );
        Ok(record)
    }

    async fn count_line(
        &self,
        input: &NewReconciliation,
        count: &CurrencyCount,
        balances: &mut Vec<BalanceWrite>,
    ) -> Result<ReconciliationLine, CashError> {
        let scope = CashScope::new(input.tenant_id, Some(input.branch_id), count.currency);
        let snap = self.snapshot(&scope).await?;
        let expected = if snap.version.is_none() && snap.movements.is_empty() {
            Decimal::ZERO
        } else {
            let next = snap.balance.checkpointed(&snap.movements, Utc::now());
            let expected = next.final_balance.amount;
            balances.push(BalanceWrite {
                balance: next,
                expected_version: snap.version,
                adjustment: None,
            });
            expected
        };
        Ok(ReconciliationLine::new(count.currency, count.opening, expected, count.counted))
    }

    /// Reconciliations of a branch on a date, in creation order.
    pub async fn reconciliations(
        &self,
        tenant_id: TenantId,
        branch_id: BranchId,
        date: NaiveDate,
    ) -> Result<Vec<DailyReconciliation>, CashError> {
        Ok(self.store.reconciliations(tenant_id, branch_id, date).await?)
    }
}

//! Recording and cancelling payments against transactions.

use std::sync::Arc;

use chrono::Utc;
use sarraf_shared::config::PaymentConfig;
use sarraf_shared::types::{PaymentId, TenantId, TransactionId, UserId};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::error::PaymentError;
use super::types::{NewPayment, NewTransaction, Payment, PaymentTolerance, PaymentTransaction};
use crate::audit::{AuditAction, AuditEvent, AuditSink};
use crate::cash::{CashMovement, CashService, NewCashMovement, PaymentMethod};
use crate::retry::RetryPolicy;
use crate::store::{PaymentCommit, PaymentStore, TenantDirectory};

/// Payment together with the transaction state it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentReceipt {
    /// The payment as stored.
    pub payment: Payment,
    /// The transaction after recomputation.
    pub transaction: PaymentTransaction,
}

/// Tracks installments against transactions.
pub struct PaymentService {
    directory: Arc<dyn TenantDirectory>,
    store: Arc<dyn PaymentStore>,
    cash: Arc<CashService>,
    audit: Arc<dyn AuditSink>,
    retry: RetryPolicy,
    tolerance: PaymentTolerance,
}

impl PaymentService {
    /// Creates the service over its ports.
    pub fn new(
        directory: Arc<dyn TenantDirectory>,
        store: Arc<dyn PaymentStore>,
        cash: Arc<CashService>,
        audit: Arc<dyn AuditSink>,
        retry: RetryPolicy,
        config: &PaymentConfig,
    ) -> Self {
        Self {
            directory,
            store,
            cash,
            audit,
            retry,
            tolerance: PaymentTolerance::from(config),
        }
    }

    /// Opens a transaction: `Single` without installments, `Open` with.
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id, total = %input.total_received))]
    pub async fn create_transaction(&self, input: NewTransaction) -> Result<PaymentTransaction, PaymentError> {
        self.directory.tenant(input.tenant_id).await?;
        let (tenant_id, actor) = (input.tenant_id, input.actor);

        let transaction = PaymentTransaction::new(input, Utc::now())?;
        let stored = self.store.insert_transaction(transaction).await?.value;

        info!(transaction_id = %stored.id, status = %stored.status, "payment transaction created");
        self.audit.emit(
            AuditEvent::new(tenant_id, actor, AuditAction::TransactionCreated, "transaction", stored.id)
                .after(&stored),
        );
        Ok(stored)
    }

    /// Records one payment and recomputes the transaction.
    ///
    /// CASH payments take money out of the branch till: the payout leg is
    /// committed with the payment and the branch balance is refreshed after.
    ///
    /// # Errors
    ///
    /// `ExceedsRemaining`, `OverpaymentRejected` or `NonPositiveAmount` when
    /// the amount does not fit; nothing is written in that case.
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id, transaction_id = %input.transaction_id, amount = %input.amount))]
    pub async fn record_payment(&self, input: NewPayment) -> Result<PaymentReceipt, PaymentError> {
        let (tenant_id, actor) = (input.tenant_id, input.actor);
        let input = &input;

        let (before, receipt, movement) = self
            .retry
            .run("record_payment", |_| async move {
                let row = self.store.transaction(tenant_id, input.transaction_id).await?;
                let payment = Payment::new(input.clone(), row.value.base_currency, Utc::now())?;
                row.value.admit(payment.converted_amount, &self.tolerance)?;

                let mut payments = self.store.payments_for(tenant_id, row.value.id).await?;
                payments.push(payment.clone());
                let next = row.value.recompute(&payments, &self.tolerance, Utc::now())?;

                let cash_movement = (payment.method == PaymentMethod::Cash)
                    .then(|| cash_leg(&row.value, &payment, false));
                let movement = self
                    .store
                    .commit_payment(PaymentCommit {
                        tenant_id,
                        transaction: row.with_value(next.clone()),
                        payment: payment.clone(),
                        cash_movement,
                    })
                    .await?;
                Ok::<_, PaymentError>((
                    row.value,
                    PaymentReceipt {
                        payment,
                        transaction: next,
                    },
                    movement,
                ))
            })
            .await?;

        self.refresh_cash(movement).await;
        info!(
            payment_id = %receipt.payment.id,
            converted = %receipt.payment.converted_amount,
            status = %receipt.transaction.status,
            "payment recorded"
        );
        self.audit.emit(
            AuditEvent::new(tenant_id, actor, AuditAction::PaymentRecorded, "payment", receipt.payment.id)
                .before(&before)
                .after(&receipt),
        );
        Ok(receipt)
    }

    /// Marks a payment cancelled and recomputes the transaction from the
    /// payments still active.
    ///
    /// # Errors
    ///
    /// `ReasonRequired` for a blank reason, `AlreadyCancelled` on a second call.
    #[instrument(skip(self, reason))]
    pub async fn cancel_payment(
        &self,
        tenant_id: TenantId,
        payment_id: PaymentId,
        reason: &str,
        actor: UserId,
    ) -> Result<PaymentReceipt, PaymentError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(PaymentError::ReasonRequired);
        }

        let (before, receipt, movement) = self
            .retry
            .run("cancel_payment", |_| async move {
                let payment = self.store.payment(tenant_id, payment_id).await?;
                let cancelled = payment.cancel(reason, actor, Utc::now())?;
                let row = self.store.transaction(tenant_id, payment.transaction_id).await?;

                let payments: Vec<Payment> = self
                    .store
                    .payments_for(tenant_id, row.value.id)
                    .await?
                    .into_iter()
                    .map(|p| if p.id == payment_id { cancelled.clone() } else { p })
                    .collect();
                let next = row.value.recompute(&payments, &self.tolerance, Utc::now())?;

                let cash_movement = (payment.method == PaymentMethod::Cash)
                    .then(|| cash_leg(&row.value, &payment, true));
                let movement = self
                    .store
                    .commit_payment(PaymentCommit {
                        tenant_id,
                        transaction: row.with_value(next.clone()),
                        payment: cancelled.clone(),
                        cash_movement,
                    })
                    .await?;
                Ok::<_, PaymentError>((
                    payment,
                    PaymentReceipt {
                        payment: cancelled,
                        transaction: next,
                    },
                    movement,
                ))
            })
            .await?;

        self.refresh_cash(movement).await;
        info!(payment_id = %payment_id, status = %receipt.transaction.status, "payment cancelled");
        self.audit.emit(
            AuditEvent::new(tenant_id, actor, AuditAction::PaymentCancelled, "payment", payment_id)
                .before(&before)
                .after(&receipt),
        );
        Ok(receipt)
    }

    /// The payment is already committed; a failed refresh only leaves the
    /// derived balance stale until the next recalculation.
    async fn refresh_cash(&self, movement: Option<CashMovement>) {
        let Some(movement) = movement else {
            return;
        };
        if let Err(e) = self.cash.recalculate_auto_balance(movement.scope()).await {
            warn!(error = %e, scope = %movement.scope(), "cash balance refresh after payment failed");
        }
    }

    /// Loads a transaction.
    pub async fn transaction(
        &self,
        tenant_id: TenantId,
        id: TransactionId,
    ) -> Result<PaymentTransaction, PaymentError> {
        Ok(self.store.transaction(tenant_id, id).await?.value)
    }

    /// Payments of a transaction, cancelled ones included, oldest first.
    pub async fn payments(&self, tenant_id: TenantId, id: TransactionId) -> Result<Vec<Payment>, PaymentError> {
        Ok(self.store.payments_for(tenant_id, id).await?)
    }
}

/// Till leg of a CASH payment: money out on payment, back in on cancellation.
fn cash_leg(transaction: &PaymentTransaction, payment: &Payment, reversing: bool) -> CashMovement {
    let amount = if reversing {
        payment.amount
    } else {
        payment.amount.negate()
    };
    NewCashMovement {
        tenant_id: transaction.tenant_id,
        branch_id: transaction.branch_id,
        amount,
        method: PaymentMethod::Cash,
        source_transaction_id: Some(transaction.id),
        source_payment_id: Some(payment.id),
        note: reversing.then(|| "payment cancelled".to_string()),
    }
    .into_movement(Utc::now())
}

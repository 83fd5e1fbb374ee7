//! Payment allocation and cash balance flows against the in-memory store.

mod common;

use chrono::Utc;
use common::Harness;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sarraf_core::audit::AuditAction;
use sarraf_core::cash::{CashScope, CurrencyCount, NewCashMovement, NewReconciliation, PaymentMethod, VarianceStatus};
use sarraf_core::payment::{NewPayment, NewTransaction, PaymentState, PaymentStatus, PaymentTransaction};
use sarraf_shared::types::{BranchId, CurrencyCode, Money};
use sarraf_shared::ErrorKind;

fn cad(amount: Decimal) -> Money {
    Money::new(amount, CurrencyCode::CAD)
}

async fn open_transaction(h: &Harness, branch: Option<BranchId>, total: Decimal, partial: bool) -> PaymentTransaction {
    h.payments
        .create_transaction(NewTransaction {
            tenant_id: h.tenant.id,
            branch_id: branch,
            total_received: cad(total),
            allow_partial_payment: partial,
            actor: h.actor,
        })
        .await
        .unwrap()
}

fn payment(h: &Harness, txn: &PaymentTransaction, amount: Money, rate: Decimal, method: PaymentMethod) -> NewPayment {
    NewPayment {
        tenant_id: h.tenant.id,
        transaction_id: txn.id,
        amount,
        exchange_rate: rate,
        method,
        actor: h.actor,
    }
}

async fn cash_in(h: &Harness, branch: BranchId, amount: Decimal, method: PaymentMethod) {
    h.cash
        .post_cash_movement(NewCashMovement {
            tenant_id: h.tenant.id,
            branch_id: Some(branch),
            amount: cad(amount),
            method,
            source_transaction_id: None,
            source_payment_id: None,
            note: None,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_record_then_cancel_restores_transaction() {
    let h = Harness::new();
    let txn = open_transaction(&h, None, dec!(100), true).await;
    assert_eq!(txn.status, PaymentStatus::Open);

    let receipt = h
        .payments
        .record_payment(payment(&h, &txn, cad(dec!(50)), Decimal::ONE, PaymentMethod::BankTransfer))
        .await
        .unwrap();
    assert_eq!(receipt.transaction.status, PaymentStatus::Partial);
    assert_eq!(receipt.transaction.remaining_balance, cad(dec!(50)));

    let cancelled = h
        .payments
        .cancel_payment(h.tenant.id, receipt.payment.id, "entered twice", h.actor)
        .await
        .unwrap();
    assert!(matches!(cancelled.payment.state, PaymentState::Cancelled { .. }));
    assert_eq!(cancelled.transaction.status, PaymentStatus::Open);
    assert_eq!(cancelled.transaction.total_paid, cad(dec!(0)));
    assert_eq!(cancelled.transaction.remaining_balance, txn.remaining_balance);

    // Cancelled payments stay on record.
    let payments = h.payments.payments(h.tenant.id, txn.id).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert!(!payments[0].is_active());

    let err = h
        .payments
        .cancel_payment(h.tenant.id, receipt.payment.id, "again", h.actor)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    assert_eq!(h.audit.with_action(AuditAction::PaymentRecorded).len(), 1);
    assert_eq!(h.audit.with_action(AuditAction::PaymentCancelled).len(), 1);
}

#[tokio::test]
async fn test_foreign_payment_is_converted() {
    let h = Harness::new();
    let txn = open_transaction(&h, None, dec!(100), true).await;

    let receipt = h
        .payments
        .record_payment(payment(
            &h,
            &txn,
            Money::new(dec!(50), CurrencyCode::USD),
            dec!(1.35),
            PaymentMethod::Card,
        ))
        .await
        .unwrap();
    assert_eq!(receipt.payment.converted_amount, cad(dec!(67.50)));
    assert_eq!(receipt.transaction.remaining_balance, cad(dec!(32.50)));
    assert_eq!(receipt.transaction.status, PaymentStatus::Partial);

    // Within the 1% band of what is left: closes the transaction.
    let receipt = h
        .payments
        .record_payment(payment(&h, &txn, cad(dec!(33)), Decimal::ONE, PaymentMethod::Card))
        .await
        .unwrap();
    assert_eq!(receipt.transaction.status, PaymentStatus::FullyPaid);

    let err = h
        .payments
        .record_payment(payment(&h, &txn, cad(dec!(5)), Decimal::ONE, PaymentMethod::Card))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidAmount);
}

#[tokio::test]
async fn test_single_payment_must_cover_total() {
    let h = Harness::new();
    let txn = open_transaction(&h, None, dec!(100), false).await;
    assert_eq!(txn.status, PaymentStatus::Single);

    for amount in [dec!(120), dec!(60)] {
        let err = h
            .payments
            .record_payment(payment(&h, &txn, cad(amount), Decimal::ONE, PaymentMethod::Cheque))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OverpaymentRejected);
    }

    let receipt = h
        .payments
        .record_payment(payment(&h, &txn, cad(dec!(100)), Decimal::ONE, PaymentMethod::Cheque))
        .await
        .unwrap();
    assert_eq!(receipt.transaction.status, PaymentStatus::Single);
    assert!(receipt.transaction.remaining_balance.is_zero());

    // Paid in full: even a cent inside the band is refused.
    for amount in [dec!(1), dec!(0.01)] {
        let err = h
            .payments
            .record_payment(payment(&h, &txn, cad(amount), Decimal::ONE, PaymentMethod::Cheque))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OverpaymentRejected);
    }
    let txn = h.payments.transaction(h.tenant.id, txn.id).await.unwrap();
    assert_eq!(txn.total_paid, cad(dec!(100)));
    assert_eq!(h.payments.payments(h.tenant.id, txn.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_fully_paid_installments_refuse_another_payment() {
    let h = Harness::new();
    let txn = open_transaction(&h, None, dec!(1000), true).await;

    let receipt = h
        .payments
        .record_payment(payment(&h, &txn, cad(dec!(995)), Decimal::ONE, PaymentMethod::BankTransfer))
        .await
        .unwrap();
    assert_eq!(receipt.transaction.status, PaymentStatus::FullyPaid);
    assert_eq!(receipt.transaction.remaining_balance, cad(dec!(5)));

    let err = h
        .payments
        .record_payment(payment(&h, &txn, cad(dec!(5)), Decimal::ONE, PaymentMethod::BankTransfer))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidAmount);

    let txn = h.payments.transaction(h.tenant.id, txn.id).await.unwrap();
    assert_eq!(txn.total_paid, cad(dec!(995)));
    assert_eq!(txn.status, PaymentStatus::FullyPaid);
}

#[tokio::test]
async fn test_cash_payment_moves_till_and_cancel_restores_it() {
    let h = Harness::new();
    let branch = BranchId::new();
    let scope = CashScope::new(h.tenant.id, Some(branch), CurrencyCode::CAD);
    cash_in(&h, branch, dec!(500), PaymentMethod::Cash).await;

    let txn = open_transaction(&h, Some(branch), dec!(100), true).await;
    let receipt = h
        .payments
        .record_payment(payment(&h, &txn, cad(dec!(40)), Decimal::ONE, PaymentMethod::Cash))
        .await
        .unwrap();
    assert_eq!(h.cash.balance(scope).await.unwrap().auto_calculated, cad(dec!(460)));

    h.payments
        .cancel_payment(h.tenant.id, receipt.payment.id, "customer refused", h.actor)
        .await
        .unwrap();
    let balance = h.cash.balance(scope).await.unwrap();
    assert_eq!(balance.auto_calculated, cad(dec!(500)));
    assert_eq!(balance.final_balance, cad(dec!(500)));
}

#[tokio::test]
async fn test_non_cash_movements_do_not_touch_till() {
    let h = Harness::new();
    let branch = BranchId::new();
    let scope = CashScope::new(h.tenant.id, Some(branch), CurrencyCode::CAD);
    cash_in(&h, branch, dec!(300), PaymentMethod::Cash).await;
    cash_in(&h, branch, dec!(700), PaymentMethod::BankTransfer).await;

    let balance = h.cash.balance(scope).await.unwrap();
    assert_eq!(balance.auto_calculated, cad(dec!(300)));
}

#[tokio::test]
async fn test_adjustment_rules_and_snapshot() {
    let h = Harness::new();
    let branch = BranchId::new();
    let scope = CashScope::new(h.tenant.id, Some(branch), CurrencyCode::CAD);
    cash_in(&h, branch, dec!(500), PaymentMethod::Cash).await;

    let err = h.cash.adjust_balance(scope, Decimal::ZERO, "nothing", h.actor).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidAmount);
    let err = h.cash.adjust_balance(scope, dec!(20), "   ", h.actor).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let adjustment = h
        .cash
        .adjust_balance(scope, dec!(20), "found in drawer", h.actor)
        .await
        .unwrap();
    assert_eq!(adjustment.balance_before, cad(dec!(500)));
    assert_eq!(adjustment.balance_after, cad(dec!(520)));
    assert_eq!(adjustment.delta, cad(dec!(20)));

    let balance = h.cash.balance(scope).await.unwrap();
    assert_eq!(balance.auto_calculated, cad(dec!(500)));
    assert_eq!(balance.manual_adjustment, cad(dec!(20)));
    assert_eq!(balance.final_balance, cad(dec!(520)));

    // Later movements keep the manual part.
    cash_in(&h, branch, dec!(-100), PaymentMethod::Cash).await;
    let balance = h.cash.balance(scope).await.unwrap();
    assert_eq!(balance.final_balance, cad(dec!(420)));

    assert_eq!(h.cash.adjustments(scope).await.unwrap(), vec![adjustment]);
    assert_eq!(h.audit.with_action(AuditAction::BalanceAdjusted).len(), 1);
}

#[tokio::test]
async fn test_daily_reconciliation_checkpoints_and_keeps_every_record() {
    let h = Harness::new();
    let branch = BranchId::new();
    let scope = CashScope::new(h.tenant.id, Some(branch), CurrencyCode::CAD);
    let today = Utc::now().date_naive();
    cash_in(&h, branch, dec!(1000), PaymentMethod::Cash).await;
    h.cash.adjust_balance(scope, dec!(-5), "torn note", h.actor).await.unwrap();

    let count = |counted| NewReconciliation {
        tenant_id: h.tenant.id,
        branch_id: branch,
        date: today,
        primary: CurrencyCount {
            currency: CurrencyCode::CAD,
            opening: dec!(0),
            counted,
        },
        breakdown: vec![CurrencyCount {
            currency: CurrencyCode::USD,
            opening: dec!(0),
            counted: dec!(0),
        }],
        notes: None,
        actor: h.actor,
    };

    let first = h.cash.create_daily_reconciliation(count(dec!(990))).await.unwrap();
    assert_eq!(first.primary.expected, cad(dec!(995)));
    assert_eq!(first.primary.variance, cad(dec!(-5)));
    assert_eq!(first.primary.status, VarianceStatus::Short);
    assert_eq!(first.breakdown[0].expected, Money::zero(CurrencyCode::USD));
    assert_eq!(first.breakdown[0].status, VarianceStatus::Balanced);

    let balance = h.cash.balance(scope).await.unwrap();
    assert!(balance.checkpoint.through_sequence > 0);
    assert_eq!(balance.auto_calculated, cad(dec!(1000)));

    cash_in(&h, branch, dec!(200), PaymentMethod::Cash).await;
    let second = h.cash.create_daily_reconciliation(count(dec!(1200))).await.unwrap();
    assert_eq!(second.primary.expected, cad(dec!(1195)));
    assert_eq!(second.primary.status, VarianceStatus::Over);

    let balance = h.cash.balance(scope).await.unwrap();
    assert_eq!(balance.auto_calculated, cad(dec!(1200)));
    assert_eq!(balance.final_balance, cad(dec!(1195)));

    let records = h.cash.reconciliations(h.tenant.id, branch, today).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, first.id);
    assert_eq!(records[1].id, second.id);
    assert_eq!(h.audit.with_action(AuditAction::ReconciliationCreated).len(), 2);
}

#[tokio::test]
async fn test_reconciliation_rejects_repeated_currency() {
    let h = Harness::new();
    let cad_count = CurrencyCount {
        currency: CurrencyCode::CAD,
        opening: dec!(0),
        counted: dec!(10),
    };
    let err = h
        .cash
        .create_daily_reconciliation(NewReconciliation {
            tenant_id: h.tenant.id,
            branch_id: BranchId::new(),
            date: Utc::now().date_naive(),
            primary: cad_count,
            breakdown: vec![cad_count],
            notes: Some("double count".into()),
            actor: h.actor,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

//! Property-based tests for payment recomputation.
//!
//! - Property 1: Record-then-cancel round-trip
//! - Property 2: Totals always equal the sum of active payments
//! - Property 3: No transaction is paid past its tolerance band

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use sarraf_shared::types::{CurrencyCode, Money, TenantId, UserId};

use super::types::{NewPayment, NewTransaction, Payment, PaymentStatus, PaymentTolerance, PaymentTransaction};
use crate::cash::PaymentMethod;

/// Strategy to generate CAD amounts in cents (0.01 to 10,000.00).
fn cad_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn cad(v: Decimal) -> Money {
    Money::new(v, CurrencyCode::CAD)
}

fn open_transaction(total: Decimal) -> PaymentTransaction {
    new_transaction(total, true)
}

fn new_transaction(total: Decimal, partial: bool) -> PaymentTransaction {
    PaymentTransaction::new(
        NewTransaction {
            tenant_id: TenantId::new(),
            branch_id: None,
            total_received: cad(total),
            allow_partial_payment: partial,
            actor: UserId::new(),
        },
        Utc::now(),
    )
    .unwrap()
}

fn pay(txn: &PaymentTransaction, amount: Decimal) -> Payment {
    Payment::new(
        NewPayment {
            tenant_id: txn.tenant_id,
            transaction_id: txn.id,
            amount: cad(amount),
            exchange_rate: Decimal::ONE,
            method: PaymentMethod::BankTransfer,
            actor: UserId::new(),
        },
        CurrencyCode::CAD,
        Utc::now(),
    )
    .unwrap()
}

/// Applies every admissible payment in order.
fn settle_some(
    txn: PaymentTransaction,
    amounts: &[Decimal],
    tol: &PaymentTolerance,
) -> (PaymentTransaction, Vec<Payment>) {
    let mut txn = txn;
    let mut payments = Vec::new();
    for amount in amounts {
        let p = pay(&txn, *amount);
        if txn.admit(p.converted_amount, tol).is_ok() {
            payments.push(p);
            txn = txn.recompute(&payments, tol, Utc::now()).unwrap();
        }
    }
    (txn, payments)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // =========================================================================
    // Property 1: Round-trip
    // Recording a payment and cancelling it restores totals and status.
    // =========================================================================
    #[test]
    fn prop_record_then_cancel_restores_state(
        total in cad_amount(),
        prior in prop::collection::vec(cad_amount(), 0..5),
        extra in cad_amount(),
    ) {
        let tol = PaymentTolerance::default();
        let (before, mut payments) = settle_some(open_transaction(total), &prior, &tol);

        let p = pay(&before, extra);
        prop_assume!(before.admit(p.converted_amount, &tol).is_ok());
        payments.push(p.clone());
        let after = before.recompute(&payments, &tol, Utc::now()).unwrap();

        let cancelled = p.cancel("reversed", UserId::new(), Utc::now()).unwrap();
        if let Some(last) = payments.last_mut() {
            *last = cancelled;
        }
        let restored = after.recompute(&payments, &tol, Utc::now()).unwrap();

        prop_assert_eq!(restored.total_paid, before.total_paid);
        prop_assert_eq!(restored.remaining_balance, before.remaining_balance);
        prop_assert_eq!(restored.status, before.status);
    }

    // =========================================================================
    // Property 2: Totals
    // total_paid is the sum of active payments; status follows the band.
    // =========================================================================
    #[test]
    fn prop_totals_match_active_payments(
        total in cad_amount(),
        amounts in prop::collection::vec(cad_amount(), 1..8),
    ) {
        let tol = PaymentTolerance::default();
        let (txn, payments) = settle_some(open_transaction(total), &amounts, &tol);

        let sum: Decimal = payments.iter().map(|p| p.converted_amount.amount).sum();
        prop_assert_eq!(txn.total_paid.amount, sum);
        prop_assert_eq!(txn.remaining_balance.amount, total - sum);
        prop_assert!(txn.remaining_balance.amount >= -tol.band(total));

        let expected = if sum.is_zero() {
            PaymentStatus::Open
        } else if total - sum <= tol.band(total) {
            PaymentStatus::FullyPaid
        } else {
            PaymentStatus::Partial
        };
        prop_assert_eq!(txn.status, expected);
    }

    // =========================================================================
    // Property 3: Overpayment
    // After any sequence of admitted payments, nothing beyond the band was
    // taken, and a settled transaction refuses every further payment.
    // =========================================================================
    #[test]
    fn prop_never_paid_past_band(
        total in cad_amount(),
        partial in any::<bool>(),
        amounts in prop::collection::vec(cad_amount(), 1..10),
        last in cad_amount(),
    ) {
        let tol = PaymentTolerance::default();
        let mut amounts = amounts;
        if !partial {
            // Give the single payment a chance to land.
            amounts.insert(0, total);
        }
        let (txn, payments) = settle_some(new_transaction(total, partial), &amounts, &tol);

        prop_assert!(txn.remaining_balance.amount >= -tol.band(total));
        prop_assert!(txn.total_paid.amount <= total + tol.band(total));
        if !partial {
            prop_assert_eq!(payments.len(), 1);
        }
        if txn.is_settled() {
            prop_assert!(txn.admit(cad(last), &tol).is_err());
        }
    }
}

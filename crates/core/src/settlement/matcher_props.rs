//! Property-based tests for the settlement matcher and remittance arithmetic.
//!
//! - Property 1: Conservation of settled rials
//! - Property 2: No over-allocation
//! - Property 3: Status monotonicity

use chrono::{Duration, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use sarraf_shared::types::{CurrencyCode, Money, TenantId, UserId};

use super::matcher::propose;
use super::types::Strategy as MatchStrategy;
use crate::remittance::{IncomingRemittance, NewRemittance, OutgoingRemittance, OutgoingStatus};

/// Strategy to generate rial amounts (1 to 50,000,000).
fn rial_amount() -> impl Strategy<Value = Decimal> {
    (1i64..50_000_000i64).prop_map(Decimal::from)
}

/// Strategy to generate CAD/IRR rates (70,000 to 90,000).
fn rial_rate() -> impl Strategy<Value = Decimal> {
    (70_000i64..90_000i64).prop_map(Decimal::from)
}

fn match_strategy() -> impl Strategy<Value = MatchStrategy> {
    prop_oneof![
        Just(MatchStrategy::Fifo),
        Just(MatchStrategy::Lifo),
        Just(MatchStrategy::BestRate)
    ]
}

fn irr(v: Decimal) -> Money {
    Money::new(v, CurrencyCode::IRR)
}

fn new_input(tenant_id: TenantId, amount: Decimal) -> NewRemittance {
    NewRemittance {
        tenant_id,
        client_id: None,
        reference: "P".to_string(),
        amount_irr: irr(amount),
        rate_cad: None,
        created_by: UserId::new(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Property 1: Conservation
    // For any accepted sequence of settlements, settled == amount - remaining.
    // =========================================================================
    #[test]
    fn prop_settled_equals_amount_minus_remaining(
        total in rial_amount(),
        takes in prop::collection::vec(rial_amount(), 1..10),
    ) {
        let mut outgoing = OutgoingRemittance::new(new_input(TenantId::new(), total), Decimal::from(80_000), Utc::now()).unwrap();
        let mut accepted = Decimal::ZERO;

        for take in takes {
            if let Ok(next) = outgoing.apply_settlement(irr(take), Utc::now()) {
                accepted += take;
                outgoing = next;
            }
            prop_assert_eq!(outgoing.settled_irr.amount, accepted);
            prop_assert_eq!(outgoing.settled_irr.amount, outgoing.amount_irr.amount - outgoing.remaining_irr.amount);
            prop_assert!(!outgoing.remaining_irr.is_negative());
        }
    }

    // =========================================================================
    // Property 2: No over-allocation
    // Proposals never exceed the incoming remainder nor any candidate remainder.
    // =========================================================================
    #[test]
    fn prop_proposals_never_over_allocate(
        incoming_amount in rial_amount(),
        debts in prop::collection::vec((rial_amount(), rial_rate()), 0..8),
        strategy in match_strategy(),
    ) {
        let tenant = TenantId::new();
        let incoming = IncomingRemittance::new(new_input(tenant, incoming_amount), Decimal::from(81_000), Utc::now()).unwrap();
        let candidates: Vec<OutgoingRemittance> = debts
            .iter()
            .enumerate()
            .map(|(i, (amount, rate))| {
                let created = Utc::now() - Duration::minutes(i64::try_from(i).unwrap_or(0));
                OutgoingRemittance::new(new_input(tenant, *amount), *rate, created).unwrap()
            })
            .collect();

        let proposals = propose(&incoming, candidates.clone(), strategy, 4).unwrap();
        let total: Decimal = proposals.iter().map(|p| p.proposed_irr.amount).sum();
        prop_assert!(total <= incoming_amount);

        let debt_total: Decimal = debts.iter().map(|(a, _)| *a).sum();
        prop_assert_eq!(total, incoming_amount.min(debt_total));

        for p in &proposals {
            prop_assert!(p.proposed_irr.is_positive());
            let debt = candidates.iter().find(|c| c.id == p.outgoing_id).unwrap();
            prop_assert!(p.proposed_irr.amount <= debt.remaining_irr.amount);
        }
    }

    // =========================================================================
    // Property 3: Status monotonicity
    // Outgoing status only moves PENDING -> PARTIAL -> COMPLETED.
    // =========================================================================
    #[test]
    fn prop_status_only_moves_forward(
        total in rial_amount(),
        takes in prop::collection::vec(rial_amount(), 1..10),
    ) {
        let rank = |s: OutgoingStatus| match s {
            OutgoingStatus::Pending => 0,
            OutgoingStatus::Partial => 1,
            OutgoingStatus::Completed => 2,
            OutgoingStatus::Cancelled => 3,
        };
        let mut outgoing = OutgoingRemittance::new(new_input(TenantId::new(), total), Decimal::from(80_000), Utc::now()).unwrap();

        for take in takes {
            let before = outgoing.status;
            if let Ok(next) = outgoing.apply_settlement(irr(take), Utc::now()) {
                prop_assert!(rank(next.status) >= rank(before));
                prop_assert_ne!(next.status, OutgoingStatus::Pending);
                outgoing = next;
            } else if before == OutgoingStatus::Completed {
                prop_assert!(outgoing.remaining_irr.is_zero());
            }
        }
    }
}

//! Candidate ordering and settlement proposals.
//!
//! Pure computation over remittance snapshots; nothing here mutates state.

use std::cmp::Ordering;

use sarraf_shared::types::Money;

use super::error::SettlementError;
use super::profit::realized_profit;
use super::types::{SettlementProposal, Strategy};
use crate::remittance::{IncomingRemittance, OutgoingRemittance, RemittanceError};

fn by_creation(a: &OutgoingRemittance, b: &OutgoingRemittance) -> Ordering {
    a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id))
}

/// Sorts candidates in the order the strategy settles them.
///
/// FIFO and MANUAL use creation order, LIFO its reverse. BEST_RATE puts the
/// highest buy rate first and breaks ties by creation order.
pub fn order_candidates(strategy: Strategy, candidates: &mut [OutgoingRemittance]) {
    match strategy {
        Strategy::Fifo | Strategy::Manual => candidates.sort_by(by_creation),
        Strategy::Lifo => candidates.sort_by(|a, b| by_creation(b, a)),
        Strategy::BestRate => candidates.sort_by(|a, b| {
            b.buy_rate_cad
                .cmp(&a.buy_rate_cad)
                .then_with(|| by_creation(a, b))
        }),
    }
}

/// Proposes matches of `incoming` against the candidate debts.
///
/// Candidates from other tenants or no longer open are ignored. For every
/// strategy except MANUAL the incoming remainder is consumed in order and the
/// list stops once it reaches zero; MANUAL lists every candidate with its own
/// `min(incoming remaining, candidate remaining)`.
///
/// # Errors
///
/// Fails with `IncomingNotSettleable` unless the incoming remittance can still
/// be allocated and has rials remaining.
pub fn propose(
    incoming: &IncomingRemittance,
    candidates: Vec<OutgoingRemittance>,
    strategy: Strategy,
    profit_decimal_places: u32,
) -> Result<Vec<SettlementProposal>, SettlementError> {
    if !incoming.status.accepts_allocation() || !incoming.remaining_irr.is_positive() {
        return Err(RemittanceError::IncomingNotSettleable {
            id: incoming.id,
            status: incoming.status,
        }
        .into());
    }

    let mut pool: Vec<OutgoingRemittance> = candidates
        .into_iter()
        .filter(|o| o.tenant_id == incoming.tenant_id && o.is_open())
        .collect();
    order_candidates(strategy, &mut pool);

    let mut proposals = Vec::new();
    let mut available = incoming.remaining_irr;
    for candidate in &pool {
        if !available.is_positive() {
            break;
        }
        let amount: Money = available.checked_min(candidate.remaining_irr)?;
        let projected_profit_cad = realized_profit(
            amount,
            candidate.buy_rate_cad,
            incoming.sell_rate_cad,
            profit_decimal_places,
        )?;
        proposals.push(SettlementProposal {
            outgoing_id: candidate.id,
            proposed_irr: amount,
            outgoing_buy_rate: candidate.buy_rate_cad,
            projected_profit_cad,
        });
        if strategy != Strategy::Manual {
            available = available.checked_sub(amount)?;
        }
    }
    Ok(proposals)
}

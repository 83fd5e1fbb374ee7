//! Book summary: what is still owed, what is still unallocated, what was earned.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sarraf_shared::types::{CurrencyCode, Money, MoneyError};

use crate::remittance::{IncomingRemittance, OutgoingRemittance};
use crate::settlement::RemittanceSettlement;

/// Snapshot of a tenant's settlement book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSummary {
    /// Outgoing remittances on record.
    pub outgoing_count: usize,
    /// Incoming remittances on record.
    pub incoming_count: usize,
    /// Settlements on record.
    pub settlement_count: usize,
    /// Rials still owed on open outgoing remittances.
    pub outstanding_outgoing_irr: Money,
    /// CAD cost basis of the outstanding rials, at each debt's buy rate.
    pub outstanding_outgoing_cad: Money,
    /// Rials received but not yet matched to a debt.
    pub unallocated_incoming_irr: Money,
    /// Realized profit across all settlements.
    pub realized_profit_cad: Money,
    /// Outgoing remittances per status.
    pub outgoing_by_status: BTreeMap<String, usize>,
    /// Incoming remittances per status.
    pub incoming_by_status: BTreeMap<String, usize>,
}

/// Summarizes remittances and settlements of one tenant.
///
/// # Errors
///
/// Returns `CurrencyMismatch` if a record carries an unexpected currency.
pub fn summarize_book(
    outgoing: &[OutgoingRemittance],
    incoming: &[IncomingRemittance],
    settlements: &[RemittanceSettlement],
) -> Result<BookSummary, MoneyError> {
    let mut outstanding_irr = Money::zero(CurrencyCode::IRR);
    let mut outstanding_cad = Money::zero(CurrencyCode::CAD);
    let mut outgoing_by_status = BTreeMap::new();
    for o in outgoing {
        *outgoing_by_status.entry(o.status.to_string()).or_insert(0) += 1;
        if o.is_open() {
            outstanding_irr = outstanding_irr.checked_add(o.remaining_irr)?;
            let cad = o.remaining_irr.divide_by_rate(o.buy_rate_cad, CurrencyCode::CAD)?;
            outstanding_cad = outstanding_cad.checked_add(cad)?;
        }
    }

    let mut unallocated_irr = Money::zero(CurrencyCode::IRR);
    let mut incoming_by_status = BTreeMap::new();
    for i in incoming {
        *incoming_by_status.entry(i.status.to_string()).or_insert(0) += 1;
        if i.status.accepts_allocation() {
            unallocated_irr = unallocated_irr.checked_add(i.remaining_irr)?;
        }
    }

    let realized = settlements
        .iter()
        .try_fold(Money::zero(CurrencyCode::CAD), |acc, s| acc.checked_add(s.profit_cad))?;

    Ok(BookSummary {
        outgoing_count: outgoing.len(),
        incoming_count: incoming.len(),
        settlement_count: settlements.len(),
        outstanding_outgoing_irr: outstanding_irr,
        outstanding_outgoing_cad: outstanding_cad,
        unallocated_incoming_irr: unallocated_irr,
        realized_profit_cad: realized,
        outgoing_by_status,
        incoming_by_status,
    })
}

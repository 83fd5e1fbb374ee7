//! Realized FX profit of a settlement.
//!
//! The same rial amount is valued at the incoming sell rate and at the outgoing
//! buy rate; profit is the CAD spread between the two:
//!
//! ```text
//! profit_cad = settled_irr * (1/sell_rate - 1/buy_rate)
//! ```

use rust_decimal::Decimal;
use sarraf_shared::types::{CurrencyCode, Money, MoneyError};

use crate::currency::round_bankers;

/// Computes the CAD profit of settling `settled_irr`, rounded to `decimal_places`.
///
/// # Errors
///
/// Returns `InvalidRate` for a non-positive rate and `CurrencyMismatch` if the
/// amount is not in rials.
pub fn realized_profit(
    settled_irr: Money,
    outgoing_buy_rate: Decimal,
    incoming_sell_rate: Decimal,
    decimal_places: u32,
) -> Result<Money, MoneyError> {
    Money::zero(CurrencyCode::IRR).ensure_same_currency(&settled_irr)?;
    for rate in [outgoing_buy_rate, incoming_sell_rate] {
        if rate <= Decimal::ZERO {
            return Err(MoneyError::InvalidRate(rate));
        }
    }

    let at_sell = settled_irr
        .amount
        .checked_div(incoming_sell_rate)
        .ok_or(MoneyError::InvalidRate(incoming_sell_rate))?;
    let at_buy = settled_irr
        .amount
        .checked_div(outgoing_buy_rate)
        .ok_or(MoneyError::InvalidRate(outgoing_buy_rate))?;

    Ok(Money::new(round_bankers(at_sell - at_buy, decimal_places), CurrencyCode::CAD))
}

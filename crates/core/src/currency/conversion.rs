//! Currency conversion logic.
//!
//! CRITICAL: Rounding strategy for multi-currency:
//! - Always round to the target currency's decimal places
//! - Use banker's rounding (round half to even)
//! - Rates are quoted as units of target per one unit of base

use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

/// Converts an amount using the given exchange rate.
///
/// Uses banker's rounding (round half to even) to minimize cumulative errors.
#[must_use]
pub fn convert_amount(amount: Decimal, rate: Decimal, decimal_places: u32) -> Decimal {
    round_bankers(amount * rate, decimal_places)
}

/// Converts an amount quoted in target units back to base units (`amount / rate`).
///
/// Returns `None` for a zero rate.
#[must_use]
pub fn divide_amount(amount: Decimal, rate: Decimal, decimal_places: u32) -> Option<Decimal> {
    amount
        .checked_div(rate)
        .map(|v| round_bankers(v, decimal_places))
}

/// Rounds with banker's rounding.
#[must_use]
pub fn round_bankers(value: Decimal, decimal_places: u32) -> Decimal {
    value.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointNearestEven)
}

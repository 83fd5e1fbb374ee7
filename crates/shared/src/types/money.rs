//! Money type with decimal precision and currency.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! This type wraps `rust_decimal::Decimal` for arbitrary precision and refuses
//! to combine amounts of different currencies.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors raised by money arithmetic and currency parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// Arithmetic attempted across two different currencies.
    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch {
        /// Currency of the left-hand operand.
        expected: CurrencyCode,
        /// Currency of the right-hand operand.
        got: CurrencyCode,
    },

    /// Currency code is not 3-4 ASCII letters.
    #[error("Invalid currency code: {0:?}")]
    InvalidCurrency(String),

    /// Exchange rate must be strictly positive.
    #[error("Exchange rate must be positive, got {0}")]
    InvalidRate(Decimal),
}

/// ISO-like currency code: 3 or 4 ASCII letters, stored upper-case.
///
/// Kept inline so `Money` stays `Copy`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CurrencyCode {
    bytes: [u8; 4],
    len: u8,
}

impl CurrencyCode {
    /// Canadian Dollar.
    pub const CAD: Self = Self::from_ascii(*b"CAD\0", 3);
    /// Iranian Rial.
    pub const IRR: Self = Self::from_ascii(*b"IRR\0", 3);
    /// US Dollar.
    pub const USD: Self = Self::from_ascii(*b"USD\0", 3);
    /// Euro.
    pub const EUR: Self = Self::from_ascii(*b"EUR\0", 3);
    /// Tether, the one 4-letter code the desks quote.
    pub const USDT: Self = Self::from_ascii(*b"USDT", 4);

    const fn from_ascii(bytes: [u8; 4], len: u8) -> Self {
        Self { bytes, len }
    }

    /// Parses a currency code, accepting lower-case input.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::InvalidCurrency` unless the input is 3-4 ASCII letters.
    pub fn parse(code: &str) -> Result<Self, MoneyError> {
        let trimmed = code.trim();
        if !(3..=4).contains(&trimmed.len()) || !trimmed.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(MoneyError::InvalidCurrency(code.to_string()));
        }

        let mut bytes = [0u8; 4];
        for (slot, b) in bytes.iter_mut().zip(trimmed.bytes()) {
            *slot = b.to_ascii_uppercase();
        }

        let len = u8::try_from(trimmed.len())
            .map_err(|_| MoneyError::InvalidCurrency(code.to_string()))?;
        Ok(Self::from_ascii(bytes, len))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Only ASCII letters are ever stored.
        std::str::from_utf8(&self.bytes[..usize::from(self.len)]).unwrap_or("???")
    }

    /// Number of minor-unit decimal places used when rounding amounts.
    ///
    /// Rial and Yen are handled as whole units; everything else uses cents.
    #[must_use]
    pub fn decimal_places(&self) -> u32 {
        match self.as_str() {
            "IRR" | "JPY" => 0,
            _ => 2,
        }
    }

    /// The smallest representable amount for this currency.
    #[must_use]
    pub fn minor_unit(&self) -> Decimal {
        Decimal::new(1, self.decimal_places())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CurrencyCode({})", self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for CurrencyCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CurrencyCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Represents a monetary amount with currency.
///
/// Uses `Decimal` internally to avoid floating-point precision errors.
/// Amounts may be negative: ledger and cash movements are signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    /// The amount in major units (e.g. dollars, rials).
    pub amount: Decimal,
    /// Currency code (e.g. "CAD", "IRR").
    pub currency: CurrencyCode,
}

impl Money {
    /// Creates a new Money instance.
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// Creates a zero amount in the specified currency.
    #[must_use]
    pub const fn zero(currency: CurrencyCode) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Returns true if the amount is strictly positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Fails unless `other` is in the same currency.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::CurrencyMismatch` when the currencies differ.
    pub fn ensure_same_currency(&self, other: &Self) -> Result<(), MoneyError> {
        if self.currency == other.currency {
            Ok(())
        } else {
            Err(MoneyError::CurrencyMismatch {
                expected: self.currency,
                got: other.currency,
            })
        }
    }

    /// Adds two amounts of the same currency.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::CurrencyMismatch` when the currencies differ.
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        self.ensure_same_currency(&other)?;
        Ok(Self::new(self.amount + other.amount, self.currency))
    }

    /// Subtracts `other` from `self`.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::CurrencyMismatch` when the currencies differ.
    pub fn checked_sub(self, other: Self) -> Result<Self, MoneyError> {
        self.ensure_same_currency(&other)?;
        Ok(Self::new(self.amount - other.amount, self.currency))
    }

    /// Returns the smaller of two amounts of the same currency.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::CurrencyMismatch` when the currencies differ.
    pub fn checked_min(self, other: Self) -> Result<Self, MoneyError> {
        self.ensure_same_currency(&other)?;
        Ok(if other.amount < self.amount { other } else { self })
    }

    /// Returns the amount with its sign flipped.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::new(-self.amount, self.currency)
    }

    /// Returns the absolute amount.
    #[must_use]
    pub fn abs(self) -> Self {
        Self::new(self.amount.abs(), self.currency)
    }

    /// Rounds to the currency's minor units using banker's rounding.
    #[must_use]
    pub fn round_to_minor_units(self) -> Self {
        Self::new(
            self.amount.round_dp_with_strategy(
                self.currency.decimal_places(),
                RoundingStrategy::MidpointNearestEven,
            ),
            self.currency,
        )
    }

    /// Converts into `target` by multiplying with `rate` (1 self = rate target).
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::InvalidRate` unless `rate` is positive.
    pub fn convert(self, rate: Decimal, target: CurrencyCode) -> Result<Self, MoneyError> {
        if rate <= Decimal::ZERO {
            return Err(MoneyError::InvalidRate(rate));
        }
        Ok(Self::new(self.amount * rate, target).round_to_minor_units())
    }

    /// Converts into `target` by dividing by `rate` (rate self = 1 target).
    ///
    /// Used for rial quotes, where the rate is expressed as rials per dollar.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::InvalidRate` unless `rate` is positive.
    pub fn divide_by_rate(self, rate: Decimal, target: CurrencyCode) -> Result<Self, MoneyError> {
        if rate <= Decimal::ZERO {
            return Err(MoneyError::InvalidRate(rate));
        }
        Ok(Self::new(self.amount / rate, target).round_to_minor_units())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

#[cfg(test)]
#[path = "money_tests.rs"]
mod tests;

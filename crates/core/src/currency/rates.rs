//! Read-only FX rate lookup.

use rust_decimal::Decimal;
use sarraf_shared::types::{CurrencyCode, TenantId};
use sarraf_shared::{AppError, ErrorKind};
use thiserror::Error;

/// Source of exchange rates; 1 `base` = rate `target`.
///
/// Implementations own fetching and caching; callers only read.
pub trait RateProvider: Send + Sync {
    /// Current rate for the pair, if one is quoted.
    fn get_rate(&self, tenant_id: TenantId, base: CurrencyCode, target: CurrencyCode) -> Option<Decimal>;
}

/// Rate lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateError {
    /// No rate quoted for the pair.
    #[error("No exchange rate found for {base} to {target}")]
    NotQuoted {
        /// Base currency.
        base: CurrencyCode,
        /// Target currency.
        target: CurrencyCode,
    },

    /// Provider returned a zero or negative rate.
    #[error("Exchange rate for {base} to {target} must be positive, got {rate}")]
    NonPositive {
        /// Base currency.
        base: CurrencyCode,
        /// Target currency.
        target: CurrencyCode,
        /// Offending rate.
        rate: Decimal,
    },
}

impl RateError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotQuoted { .. } => "NO_EXCHANGE_RATE",
            Self::NonPositive { .. } => "INVALID_EXCHANGE_RATE",
        }
    }

    /// Returns the taxonomy bucket.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotQuoted { .. } => ErrorKind::NotFound,
            Self::NonPositive { .. } => ErrorKind::Validation,
        }
    }
}

impl From<RateError> for AppError {
    fn from(err: RateError) -> Self {
        Self::domain(err.kind(), err.to_string())
    }
}

/// Looks up a rate, treating a same-currency pair as 1.
pub fn require_rate(
    provider: &dyn RateProvider,
    tenant_id: TenantId,
    base: CurrencyCode,
    target: CurrencyCode,
) -> Result<Decimal, RateError> {
    if base == target {
        return Ok(Decimal::ONE);
    }
    let rate = provider
        .get_rate(tenant_id, base, target)
        .ok_or(RateError::NotQuoted { base, target })?;
    if rate <= Decimal::ZERO {
        return Err(RateError::NonPositive { base, target, rate });
    }
    Ok(rate)
}

//! Cash error types.

use sarraf_shared::types::{CurrencyCode, MoneyError};
use sarraf_shared::{AppError, ErrorKind};
use thiserror::Error;

use crate::retry::Retryable;
use crate::store::StoreError;

/// Errors raised by cash balances and reconciliations.
#[derive(Debug, Error)]
pub enum CashError {
    /// Manual adjustment of zero.
    #[error("Adjustment delta must not be zero")]
    ZeroAdjustment,

    /// Manual adjustment without a reason.
    #[error("Adjustment reason is required")]
    ReasonRequired,

    /// Movement of zero.
    #[error("Cash movement amount must not be zero")]
    ZeroMovement,

    /// A currency counted twice in one reconciliation.
    #[error("Currency {0} appears more than once in the count")]
    DuplicateCurrency(CurrencyCode),

    /// Mixed-currency arithmetic.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CashError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ZeroAdjustment => "ZERO_ADJUSTMENT",
            Self::ReasonRequired => "REASON_REQUIRED",
            Self::ZeroMovement => "ZERO_MOVEMENT",
            Self::DuplicateCurrency(_) => "DUPLICATE_CURRENCY",
            Self::Money(_) => self.kind().as_str(),
            Self::Store(e) => e.error_code(),
        }
    }

    /// Returns the taxonomy bucket.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ZeroAdjustment | Self::ZeroMovement => ErrorKind::InvalidAmount,
            Self::ReasonRequired | Self::DuplicateCurrency(_) => ErrorKind::Validation,
            Self::Money(MoneyError::CurrencyMismatch { .. }) => ErrorKind::CurrencyMismatch,
            Self::Money(MoneyError::InvalidCurrency(_)) => ErrorKind::InvalidCurrency,
            Self::Money(MoneyError::InvalidRate(_)) => ErrorKind::Validation,
            Self::Store(e) => e.kind(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_retryable())
    }
}

impl Retryable for CashError {
    fn is_retryable(&self) -> bool {
        CashError::is_retryable(self)
    }
}

impl From<CashError> for AppError {
    fn from(err: CashError) -> Self {
        Self::domain(err.kind(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(CashError::ZeroAdjustment, ErrorKind::InvalidAmount)]
    #[case(CashError::ReasonRequired, ErrorKind::Validation)]
    #[case(CashError::DuplicateCurrency(CurrencyCode::CAD), ErrorKind::Validation)]
    #[case(
        CashError::Store(StoreError::not_found("cash_balance", "x")),
        ErrorKind::NotFound
    )]
    fn test_kind_mapping(#[case] err: CashError, #[case] kind: ErrorKind) {
        assert_eq!(err.kind(), kind);
    }
}

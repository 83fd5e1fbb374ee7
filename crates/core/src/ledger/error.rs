//! Ledger error types.

use rust_decimal::Decimal;
use sarraf_shared::types::{ClientId, CurrencyCode, LedgerEntryId, MoneyError};
use sarraf_shared::{AppError, ErrorKind};
use thiserror::Error;

use crate::currency::RateError;
use crate::store::StoreError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Client Errors ==========
    /// Client not found in the tenant, or deleted.
    #[error("Client not found: {0}")]
    ClientNotFound(ClientId),

    // ========== Exchange Errors ==========
    /// Both legs of an exchange use the same currency.
    #[error("Source and target currencies must be different")]
    SameCurrencyExchange,

    /// The sold amount of an exchange must be positive.
    #[error("Exchange amount must be positive, got {0}")]
    NonPositiveExchange(Decimal),

    /// Bought amount is inconsistent with sold amount and rate.
    #[error("Exchange legs do not net at the applied rate: expected {expected} {currency}, got {actual}")]
    ExchangeMismatch {
        /// Currency of the bought leg.
        currency: CurrencyCode,
        /// `sold * rate`, rounded.
        expected: Decimal,
        /// Supplied bought amount.
        actual: Decimal,
    },

    /// No usable rate for the exchange.
    #[error(transparent)]
    Rate(#[from] RateError),

    // ========== Reversal Errors ==========
    /// A reversal cannot itself be reversed.
    #[error("Entry {0} is a reversal and cannot be reversed")]
    CannotReverseReversal(LedgerEntryId),

    /// The entry already has a reversal.
    #[error("Entry {0} has already been reversed")]
    AlreadyReversed(LedgerEntryId),

    /// Reversals must state why.
    #[error("A reason is required to reverse an entry")]
    ReasonRequired,

    // ========== Money and Storage ==========
    /// Malformed currency or mixed-currency arithmetic.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ClientNotFound(_) => "CLIENT_NOT_FOUND",
            Self::SameCurrencyExchange => "SAME_CURRENCY_EXCHANGE",
            Self::NonPositiveExchange(_) => "INVALID_AMOUNT",
            Self::ExchangeMismatch { .. } => "EXCHANGE_MISMATCH",
            Self::Rate(e) => e.error_code(),
            Self::CannotReverseReversal(_) => "CANNOT_REVERSE_REVERSAL",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::ReasonRequired => "REASON_REQUIRED",
            Self::Money(_) => self.kind().as_str(),
            Self::Store(e) => e.error_code(),
        }
    }

    /// Returns the taxonomy bucket.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ClientNotFound(_) => ErrorKind::NotFound,
            Self::SameCurrencyExchange | Self::ReasonRequired => ErrorKind::Validation,
            Self::NonPositiveExchange(_) | Self::ExchangeMismatch { .. } => ErrorKind::InvalidAmount,
            Self::Rate(e) => e.kind(),
            Self::CannotReverseReversal(_) | Self::AlreadyReversed(_) => ErrorKind::InvalidState,
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

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        Self::domain(err.kind(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(LedgerError::ReasonRequired.error_code(), "REASON_REQUIRED");
        assert_eq!(
            LedgerError::Money(MoneyError::InvalidCurrency("C$".into())).error_code(),
            "INVALID_CURRENCY"
        );
        assert_eq!(
            LedgerError::AlreadyReversed(LedgerEntryId::new()).error_code(),
            "ALREADY_REVERSED"
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(LedgerError::ClientNotFound(ClientId::new()).http_status_code(), 404);
        assert_eq!(LedgerError::SameCurrencyExchange.http_status_code(), 400);
        assert_eq!(
            LedgerError::CannotReverseReversal(LedgerEntryId::new()).http_status_code(),
            422
        );
        assert_eq!(
            LedgerError::Store(StoreError::Backend("io".into())).http_status_code(),
            500
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(LedgerError::Store(StoreError::VersionConflict {
            entity: "ledger_entry",
            id: "x".into(),
            expected: 1,
            actual: 2,
        })
        .is_retryable());
        assert!(!LedgerError::ReasonRequired.is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::ExchangeMismatch {
            currency: CurrencyCode::IRR,
            expected: dec!(8000000),
            actual: dec!(7999000),
        };
        assert_eq!(
            err.to_string(),
            "Exchange legs do not net at the applied rate: expected 8000000 IRR, got 7999000"
        );
    }
}

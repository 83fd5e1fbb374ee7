//! Payment error types.

use rust_decimal::Decimal;
use sarraf_shared::types::{Money, MoneyError, PaymentId};
use sarraf_shared::{AppError, ErrorKind};
use thiserror::Error;

use crate::cash::CashError;
use crate::retry::Retryable;
use crate::store::StoreError;

/// Errors raised by payment transactions.
#[derive(Debug, Error)]
pub enum PaymentError {
    // ========== Amount Errors ==========
    /// Transaction total is zero or negative.
    #[error("Transaction total must be positive, got {0}")]
    NonPositiveTotal(Money),

    /// Payment is zero or negative.
    #[error("Payment amount must be positive, got {0}")]
    NonPositiveAmount(Money),

    /// Installment larger than the remaining balance plus tolerance.
    #[error("Payment {requested} exceeds remaining balance {remaining}")]
    ExceedsRemaining {
        /// Converted payment.
        requested: Money,
        /// Remaining balance.
        remaining: Money,
    },

    /// Single-payment transaction paid with something other than the balance.
    #[error("Transaction accepts a single payment of {remaining}, got {requested}")]
    OverpaymentRejected {
        /// Converted payment.
        requested: Money,
        /// Remaining balance.
        remaining: Money,
    },

    /// Rate zero, negative, or not one for a same-currency payment.
    #[error("Invalid exchange rate: {0}")]
    InvalidRate(Decimal),

    // ========== State Errors ==========
    /// Payment was cancelled before.
    #[error("Payment {0} is already cancelled")]
    AlreadyCancelled(PaymentId),

    /// Cancellation without a reason.
    #[error("Cancellation reason is required")]
    ReasonRequired,

    // ========== Collaborators ==========
    /// Cash balance refresh failed.
    #[error(transparent)]
    Cash(#[from] CashError),

    /// Mixed-currency arithmetic.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PaymentError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NonPositiveTotal(_) | Self::NonPositiveAmount(_) => "NON_POSITIVE_AMOUNT",
            Self::ExceedsRemaining { .. } => "EXCEEDS_REMAINING",
            Self::OverpaymentRejected { .. } => "OVERPAYMENT_REJECTED",
            Self::InvalidRate(_) => "INVALID_RATE",
            Self::AlreadyCancelled(_) => "ALREADY_CANCELLED",
            Self::ReasonRequired => "REASON_REQUIRED",
            Self::Cash(e) => e.error_code(),
            Self::Money(_) => self.kind().as_str(),
            Self::Store(e) => e.error_code(),
        }
    }

    /// Returns the taxonomy bucket.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NonPositiveTotal(_) | Self::NonPositiveAmount(_) | Self::ExceedsRemaining { .. } => {
                ErrorKind::InvalidAmount
            }
            Self::OverpaymentRejected { .. } => ErrorKind::OverpaymentRejected,
            Self::InvalidRate(_) | Self::ReasonRequired => ErrorKind::Validation,
            Self::AlreadyCancelled(_) => ErrorKind::InvalidState,
            Self::Cash(e) => e.kind(),
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
        match self {
            Self::Store(e) => e.is_retryable(),
            Self::Cash(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl Retryable for PaymentError {
    fn is_retryable(&self) -> bool {
        PaymentError::is_retryable(self)
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        Self::domain(err.kind(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sarraf_shared::types::CurrencyCode;

    #[test]
    fn test_overpayment_kind() {
        let cad = |v| Money::new(v, CurrencyCode::CAD);
        let err = PaymentError::OverpaymentRejected {
            requested: cad(dec!(50)),
            remaining: cad(dec!(100)),
        };
        assert_eq!(err.kind(), ErrorKind::OverpaymentRejected);
        assert_eq!(err.error_code(), "OVERPAYMENT_REJECTED");
        assert_eq!(PaymentError::AlreadyCancelled(PaymentId::new()).kind(), ErrorKind::InvalidState);
    }
}

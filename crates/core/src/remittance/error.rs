//! Remittance error types.

use rust_decimal::Decimal;
use sarraf_shared::types::{
    ClientId, CurrencyCode, IncomingRemittanceId, Money, MoneyError, OutgoingRemittanceId,
};
use sarraf_shared::{AppError, ErrorKind};
use thiserror::Error;

use super::types::{IncomingStatus, OutgoingStatus};
use crate::currency::RateError;
use crate::retry::Retryable;
use crate::store::StoreError;

/// Errors raised by remittance records and their service.
#[derive(Debug, Error)]
pub enum RemittanceError {
    // ========== Amount Errors ==========
    /// Amount is zero or negative.
    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(Money),

    /// Remittances are tracked in rials only.
    #[error("Remittance amounts must be in IRR, got {0}")]
    NotRialDenominated(CurrencyCode),

    /// Amount larger than what is left to settle.
    #[error("Amount {requested} exceeds remaining {remaining}")]
    ExceedsRemaining {
        /// Requested amount.
        requested: Money,
        /// Remaining balance.
        remaining: Money,
    },

    /// Rate is zero or negative.
    #[error("Rate must be positive, got {0}")]
    InvalidRate(Decimal),

    // ========== State Errors ==========
    /// Outgoing remittance is completed or cancelled.
    #[error("Outgoing remittance {id} is {status} and cannot be settled")]
    OutgoingNotSettleable {
        /// The remittance.
        id: OutgoingRemittanceId,
        /// Its status.
        status: OutgoingStatus,
    },

    /// Incoming remittance is completed or cancelled.
    #[error("Incoming remittance {id} is {status} and cannot be allocated")]
    IncomingNotSettleable {
        /// The remittance.
        id: IncomingRemittanceId,
        /// Its status.
        status: IncomingStatus,
    },

    /// Status change not allowed from the current status.
    #[error("Cannot move remittance from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },

    // ========== Lookup Errors ==========
    /// Client unknown or deleted.
    #[error("Client not found: {0}")]
    ClientNotFound(ClientId),

    /// No CAD/IRR rate to default from.
    #[error(transparent)]
    Rate(#[from] RateError),

    // ========== Money and Storage ==========
    /// Mixed-currency arithmetic.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RemittanceError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NonPositiveAmount(_) => "NON_POSITIVE_AMOUNT",
            Self::NotRialDenominated(_) => "NOT_RIAL_DENOMINATED",
            Self::ExceedsRemaining { .. } => "EXCEEDS_REMAINING",
            Self::InvalidRate(_) => "INVALID_RATE",
            Self::OutgoingNotSettleable { .. } | Self::IncomingNotSettleable { .. } => "NOT_SETTLEABLE",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::ClientNotFound(_) => "CLIENT_NOT_FOUND",
            Self::Rate(e) => e.error_code(),
            Self::Money(_) => self.kind().as_str(),
            Self::Store(e) => e.error_code(),
        }
    }

    /// Returns the taxonomy bucket.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NonPositiveAmount(_) | Self::ExceedsRemaining { .. } => ErrorKind::InvalidAmount,
            Self::NotRialDenominated(_) => ErrorKind::CurrencyMismatch,
            Self::InvalidRate(_) => ErrorKind::Validation,
            Self::OutgoingNotSettleable { .. }
            | Self::IncomingNotSettleable { .. }
            | Self::InvalidTransition { .. } => ErrorKind::InvalidState,
            Self::ClientNotFound(_) => ErrorKind::NotFound,
            Self::Rate(e) => e.kind(),
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

impl Retryable for RemittanceError {
    fn is_retryable(&self) -> bool {
        RemittanceError::is_retryable(self)
    }
}

impl From<RemittanceError> for AppError {
    fn from(err: RemittanceError) -> Self {
        Self::domain(err.kind(), err.to_string())
    }
}
